//! What a debug renderer should draw for the known structures. Drawing itself is up to the host.

use poi_protocol::{Cell, MapSize, Side, Structure, TowerKind};
use serde::{Deserialize, Serialize};

use crate::FactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    AllyPaint,
    AllyOther,
    Enemy,
    Neutral,
}

impl OverlayKind {
    pub fn classify(structure: Structure, team: Side) -> Self {
        match structure {
            Structure::Ruin => OverlayKind::Neutral,
            Structure::Tower { side, kind } if side == team => {
                if kind == TowerKind::Paint {
                    OverlayKind::AllyPaint
                } else {
                    OverlayKind::AllyOther
                }
            }
            Structure::Tower { .. } => OverlayKind::Enemy,
        }
    }

    /// Colour of the line from the agent to the structure.
    pub fn link_rgb(self) -> [u8; 3] {
        match self {
            OverlayKind::AllyPaint => [0, 100, 0],
            OverlayKind::AllyOther => [0, 150, 0],
            OverlayKind::Enemy => [150, 0, 0],
            OverlayKind::Neutral => [0, 0, 150],
        }
    }

    /// Colour of the short marker strokes around the structure.
    pub fn marker_rgb(self) -> [u8; 3] {
        match self {
            OverlayKind::AllyPaint => [0, 255, 0],
            OverlayKind::AllyOther => [0, 100, 0],
            OverlayKind::Enemy => [255, 0, 0],
            OverlayKind::Neutral => [0, 0, 255],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLine {
    pub from: Cell,
    pub to: Cell,
    pub rgb: [u8; 3],
}

/// A link from `viewer` to every known structure plus a star of marker strokes around it.
pub fn overlay_lines(store: &FactStore, viewer: Cell) -> Vec<OverlayLine> {
    let size = store.map_size();
    let mut lines = Vec::new();
    for tower in store.towers() {
        let kind = OverlayKind::classify(tower.structure, store.team());
        lines.push(OverlayLine {
            from: viewer,
            to: tower.cell,
            rgb: kind.link_rgb(),
        });
        lines.extend(marker_star(tower.cell, size).map(|to| OverlayLine {
            from: tower.cell,
            to,
            rgb: kind.marker_rgb(),
        }));
    }
    lines
}

fn marker_star(center: Cell, size: MapSize) -> impl Iterator<Item = Cell> {
    (-1..=1)
        .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
        .filter(|&d| d != (0, 0))
        .filter_map(move |(dx, dy)| center.translate(dx, dy, size))
}
