use serde::{Deserialize, Serialize};
use std::fmt;

// Face mesh topology indices. Each list traces its contour in a single
// rotational direction.

const LIP_OUTER: [usize; 20] = [
    0, 37, 39, 40, 185, 61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 409, 270, 269, 267,
];

const LIP_INNER: [usize; 16] = [
    13, 82, 81, 80, 191, 78, 95, 88, 178, 87, 14, 317, 402, 318, 324, 308,
];

const FACE_OVAL: [usize; 36] = [
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152,
    148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

// Upper lip: outer arc from the left corner over the cupid's bow, then back
// along the inner edge.
const UPPER_LIP: [usize; 22] = [
    61, 185, 40, 39, 37, 0, 267, 269, 270, 409, 291, 308, 415, 310, 311, 312, 13, 82, 81, 80, 191,
    78,
];

const LOWER_LIP: [usize; 22] = [
    61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 308, 324, 318, 402, 317, 14, 87, 178, 88, 95,
    78,
];

/// Landmark the static mustache overlay is pinned to.
pub const NOSE_BASE: usize = 164;
pub const LEFT_CHEEK: usize = 234;
pub const RIGHT_CHEEK: usize = 454;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    LipOuter,
    LipInner,
    FaceOval,
    UpperLip,
    LowerLip,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::LipOuter,
        Region::LipInner,
        Region::FaceOval,
        Region::UpperLip,
        Region::LowerLip,
    ];

    pub fn indices(&self) -> &'static [usize] {
        match self {
            Self::LipOuter => &LIP_OUTER,
            Self::LipInner => &LIP_INNER,
            Self::FaceOval => &FACE_OVAL,
            Self::UpperLip => &UPPER_LIP,
            Self::LowerLip => &LOWER_LIP,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LipOuter => "lip_outer",
            Self::LipInner => "lip_inner",
            Self::FaceOval => "face_oval",
            Self::UpperLip => "upper_lip",
            Self::LowerLip => "lower_lip",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
