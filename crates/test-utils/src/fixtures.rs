//! Common fixtures for climate bias tests.

/// Small land-sea layouts, row-major over (lat, lon).
pub mod masks {
    /// 3x3 island: one land cell in the middle.
    pub const ISLAND_3X3: [f32; 9] = [
        0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0,
    ];

    /// 3x4 continent on the west half.
    pub const WEST_LAND_3X4: [f32; 12] = [
        1.0, 1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, 0.0,
    ];

    /// 2x2 all land.
    pub const ALL_LAND_2X2: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
}

/// Expected coastal cells for the layouts in [`masks`], one-sided
/// neighbours, row-major.
pub mod coastal {
    /// Island: the land cell and its four edge neighbours.
    pub const ISLAND_3X3: [bool; 9] = [
        false, true, false, //
        true, true, true, //
        false, true, false,
    ];

    /// West continent: the two columns either side of the shoreline.
    pub const WEST_LAND_3X4: [bool; 12] = [
        false, true, true, false, //
        false, true, true, false, //
        false, true, true, false,
    ];
}
