//! Where every body part lives on the skin atlas.
//!
//! Tables follow the standard box unwrap: for a box of `w x h x d` pixels whose
//! unwrap starts at `(u, v)` the top and bottom faces sit in the first `d` rows,
//! the four side faces in the `h` rows below them. Faces are keyed by the side
//! of the cube they end up on (`right` = +x, `front` = +z, ...), the player
//! faces +z.

/// Atlas layout generation, derived from the atlas height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtlasVersion {
    /// 64x32 atlases, no overlay layers except the hat.
    Legacy,
    /// 64x64 atlases with separate left limbs and overlays.
    Modern,
}

impl AtlasVersion {
    pub fn detect(height: u32) -> Option<Self> {
        match height {
            32 => Some(AtlasVersion::Legacy),
            64 => Some(AtlasVersion::Modern),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            AtlasVersion::Legacy => 0,
            AtlasVersion::Modern => 1,
        }
    }
}

/// A rectangle on the atlas in pixels, origin top left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceUv {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    /// Replacement for `x` on slim arms.
    pub sx: Option<u32>,
    /// Replacement for `w` on slim arms.
    pub sw: Option<u32>,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl FaceUv {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            sx: None,
            sw: None,
            flip_x: false,
            flip_y: false,
        }
    }

    const fn slim(mut self, sx: Option<u32>, sw: Option<u32>) -> Self {
        self.sx = sx;
        self.sw = sw;
        self
    }

    const fn flipped(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    /// The rectangle actually sampled, `(x, y, w, h)`.
    pub fn rect(&self, slim: bool) -> (u32, u32, u32, u32) {
        if slim {
            (
                self.sx.unwrap_or(self.x),
                self.y,
                self.sw.unwrap_or(self.w),
                self.h,
            )
        } else {
            (self.x, self.y, self.w, self.h)
        }
    }
}

/// The six cube sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// +x
    Right,
    /// -x
    Left,
    /// +y
    Top,
    /// -y
    Bottom,
    /// +z
    Front,
    /// -z
    Back,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Right,
        Face::Left,
        Face::Top,
        Face::Bottom,
        Face::Front,
        Face::Back,
    ];
}

/// Atlas rectangles of all six faces of one cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeUv {
    pub right: FaceUv,
    pub left: FaceUv,
    pub top: FaceUv,
    pub bottom: FaceUv,
    pub front: FaceUv,
    pub back: FaceUv,
}

impl CubeUv {
    pub fn face(&self, face: Face) -> &FaceUv {
        match face {
            Face::Right => &self.right,
            Face::Left => &self.left,
            Face::Top => &self.top,
            Face::Bottom => &self.bottom,
            Face::Front => &self.front,
            Face::Back => &self.back,
        }
    }
}

const fn box_uv(u: u32, v: u32, w: u32, h: u32, d: u32) -> CubeUv {
    CubeUv {
        right: FaceUv::new(u + d + w, v + d, d, h),
        left: FaceUv::new(u, v + d, d, h),
        top: FaceUv::new(u + d, v, w, d),
        bottom: FaceUv::new(u + d + w, v, w, d).flipped(true, true),
        front: FaceUv::new(u + d, v + d, w, h),
        back: FaceUv::new(u + 2 * d + w, v + d, w, h),
    }
}

/// A 4x12x4 arm whose slim variant samples 3 pixel wide faces.
const fn arm(u: u32, v: u32) -> CubeUv {
    let regular = box_uv(u, v, 4, 12, 4);
    CubeUv {
        right: regular.right.slim(Some(u + 7), None),
        left: regular.left,
        top: regular.top.slim(None, Some(3)),
        bottom: regular.bottom.slim(Some(u + 7), Some(3)),
        front: regular.front.slim(None, Some(3)),
        back: regular.back.slim(Some(u + 11), Some(3)),
    }
}

/// Legacy atlases reuse the right limb for the left one, mirrored.
const fn mirrored(cube: CubeUv) -> CubeUv {
    const fn toggle(face: FaceUv) -> FaceUv {
        let flip_x = !face.flip_x;
        face.flipped(flip_x, face.flip_y)
    }
    CubeUv {
        right: toggle(cube.left),
        left: toggle(cube.right),
        top: toggle(cube.top),
        bottom: toggle(cube.bottom),
        front: toggle(cube.front),
        back: toggle(cube.back),
    }
}

// [legacy, modern]
static HEAD: [CubeUv; 2] = [box_uv(0, 0, 8, 8, 8), box_uv(0, 0, 8, 8, 8)];
static BODY: [CubeUv; 2] = [box_uv(16, 16, 8, 12, 4), box_uv(16, 16, 8, 12, 4)];
static RIGHT_ARM: [CubeUv; 2] = [arm(40, 16), arm(40, 16)];
static LEFT_ARM: [CubeUv; 2] = [mirrored(arm(40, 16)), arm(32, 48)];
static RIGHT_LEG: [CubeUv; 2] = [box_uv(0, 16, 4, 12, 4), box_uv(0, 16, 4, 12, 4)];
static LEFT_LEG: [CubeUv; 2] = [mirrored(box_uv(0, 16, 4, 12, 4)), box_uv(16, 48, 4, 12, 4)];

static HAT: CubeUv = box_uv(32, 0, 8, 8, 8);
static JACKET: CubeUv = box_uv(16, 32, 8, 12, 4);
static RIGHT_SLEEVE: CubeUv = arm(40, 32);
static LEFT_SLEEVE: CubeUv = arm(48, 48);
static RIGHT_TROUSERS: CubeUv = box_uv(0, 32, 4, 12, 4);
static LEFT_TROUSERS: CubeUv = box_uv(0, 48, 4, 12, 4);

// Capes are laid out on their own 64x32 atlas, the alternate one at twice the
// resolution.
static CAPE: CubeUv = box_uv(0, 0, 10, 16, 1);
static CAPE_ALTERNATE: CubeUv = box_uv(0, 0, 20, 32, 2);

/// Every cuboid the player model is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Part {
    Head,
    Hat,
    Body,
    Jacket,
    RightArm,
    RightSleeve,
    LeftArm,
    LeftSleeve,
    RightLeg,
    RightTrousers,
    LeftLeg,
    LeftTrousers,
    Cape,
}

impl Part {
    /// Node name of the part's mesh.
    pub fn name(self) -> &'static str {
        match self {
            Part::Head => "head",
            Part::Hat => "hat",
            Part::Body => "body",
            Part::Jacket => "jacket",
            Part::RightArm => "rightArm",
            Part::RightSleeve => "rightSleeve",
            Part::LeftArm => "leftArm",
            Part::LeftSleeve => "leftSleeve",
            Part::RightLeg => "rightLeg",
            Part::RightTrousers => "rightTrousers",
            Part::LeftLeg => "leftLeg",
            Part::LeftTrousers => "leftTrousers",
            Part::Cape => "cape",
        }
    }

    /// Whether the part is a transparent second layer.
    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            Part::Hat
                | Part::Jacket
                | Part::RightSleeve
                | Part::LeftSleeve
                | Part::RightTrousers
                | Part::LeftTrousers
        )
    }

    /// UV table of the part, `None` when the atlas version has no such layer.
    ///
    /// The hat exists on legacy atlases too, but the player model only adds
    /// overlays for modern atlases so it is reported as missing there as well.
    pub fn uv(self, version: AtlasVersion) -> Option<&'static CubeUv> {
        let i = version.index();
        match self {
            Part::Head => Some(&HEAD[i]),
            Part::Body => Some(&BODY[i]),
            Part::RightArm => Some(&RIGHT_ARM[i]),
            Part::LeftArm => Some(&LEFT_ARM[i]),
            Part::RightLeg => Some(&RIGHT_LEG[i]),
            Part::LeftLeg => Some(&LEFT_LEG[i]),
            Part::Cape => Some(&CAPE),
            overlay => match version {
                AtlasVersion::Legacy => None,
                AtlasVersion::Modern => Some(match overlay {
                    Part::Hat => &HAT,
                    Part::Jacket => &JACKET,
                    Part::RightSleeve => &RIGHT_SLEEVE,
                    Part::LeftSleeve => &LEFT_SLEEVE,
                    Part::RightTrousers => &RIGHT_TROUSERS,
                    _ => &LEFT_TROUSERS,
                }),
            },
        }
    }
}

/// UV table of the cape, `alternate` selects the high resolution layout.
pub fn cape_uv(alternate: bool) -> &'static CubeUv {
    if alternate { &CAPE_ALTERNATE } else { &CAPE }
}
