#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TileKind {
    #[default]
    Grass,
    Ground,
    Concrete,
    Rock,
    StoneWall,
    Tree,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    pub kind: TileKind,
    pub token: &'static str,
    pub walkable: bool,
    pub sprite_key: &'static str,
    pub fallback_color: [u8; 4],
}

pub const DEFAULT_TILE: TileKind = TileKind::Grass;

const TILE_CATALOG: [TileInfo; 7] = [
    TileInfo {
        kind: TileKind::Grass,
        token: "grass",
        walkable: true,
        sprite_key: "tiles/grass.png",
        fallback_color: [34, 139, 34, 255],
    },
    TileInfo {
        kind: TileKind::Ground,
        token: "ground",
        walkable: true,
        sprite_key: "tiles/ground.png",
        fallback_color: [139, 69, 19, 255],
    },
    TileInfo {
        kind: TileKind::Concrete,
        token: "concrete",
        walkable: true,
        sprite_key: "tiles/concrete.png",
        fallback_color: [170, 170, 165, 255],
    },
    TileInfo {
        kind: TileKind::Rock,
        token: "rock",
        walkable: false,
        sprite_key: "tiles/rock.png",
        fallback_color: [105, 105, 105, 255],
    },
    TileInfo {
        kind: TileKind::StoneWall,
        token: "stone_wall",
        walkable: false,
        sprite_key: "tiles/stone_wall.png",
        fallback_color: [128, 128, 128, 255],
    },
    TileInfo {
        kind: TileKind::Tree,
        token: "tree",
        walkable: false,
        sprite_key: "tiles/tree.png",
        fallback_color: [0, 100, 0, 255],
    },
    TileInfo {
        kind: TileKind::Water,
        token: "water",
        walkable: false,
        sprite_key: "tiles/water.png",
        fallback_color: [0, 100, 200, 255],
    },
];

impl TileKind {
    pub const ALL: [TileKind; 7] = [
        TileKind::Grass,
        TileKind::Ground,
        TileKind::Concrete,
        TileKind::Rock,
        TileKind::StoneWall,
        TileKind::Tree,
        TileKind::Water,
    ];

    pub fn info(self) -> &'static TileInfo {
        &TILE_CATALOG[self.index()]
    }

    pub fn is_walkable(self) -> bool {
        self.info().walkable
    }

    pub fn token(self) -> &'static str {
        self.info().token
    }

    const fn index(self) -> usize {
        match self {
            TileKind::Grass => 0,
            TileKind::Ground => 1,
            TileKind::Concrete => 2,
            TileKind::Rock => 3,
            TileKind::StoneWall => 4,
            TileKind::Tree => 5,
            TileKind::Water => 6,
        }
    }

    /// Parses a tile token. Unknown tokens resolve to `None`; callers decide
    /// whether to substitute [`DEFAULT_TILE`].
    pub fn from_token(token: &str) -> Option<TileKind> {
        let normalized = token.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let kind = match normalized.as_str() {
            "grass" => TileKind::Grass,
            "ground" | "dirt" | "door" => TileKind::Ground,
            "concrete" | "road" | "pavement" => TileKind::Concrete,
            "rock" | "chest" => TileKind::Rock,
            "stone_wall" | "stonewall" | "wall" => TileKind::StoneWall,
            "tree" => TileKind::Tree,
            "water" => TileKind::Water,
            _ => return None,
        };
        Some(kind)
    }

    /// Numeric ids used by older map files.
    pub fn from_legacy_id(id: i64) -> Option<TileKind> {
        let kind = match id {
            1 | 7 => TileKind::Ground,
            2 => TileKind::StoneWall,
            3 => TileKind::Water,
            4 | 9 => TileKind::Grass,
            5 => TileKind::Tree,
            6 | 8 => TileKind::Rock,
            _ => return None,
        };
        Some(kind)
    }

    pub fn parse_or_default(token: &str) -> TileKind {
        Self::from_token(token).unwrap_or(DEFAULT_TILE)
    }
}
