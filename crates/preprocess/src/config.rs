/// Default square network input used by YOLO exports
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Gray padding value used around the letterboxed image
pub const LETTERBOX_COLOR: u8 = 114;
