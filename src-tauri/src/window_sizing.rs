const ASPECT_WIDTH: f64 = 3.0;
const ASPECT_HEIGHT: f64 = 2.0;
const WIDTH_FRACTION: f64 = 0.5;
const MAX_HEIGHT_FRACTION: f64 = 0.9;

pub const PACKAGED_MIN_WIDTH: f64 = 900.0;
pub const PACKAGED_MIN_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

/// Initial 3:2 size for a work area given in logical pixels.
pub fn initial_window_size(work_width: f64, work_height: f64, packaged: bool) -> WindowSize {
    let mut width = work_width * WIDTH_FRACTION;
    let mut height = width * ASPECT_HEIGHT / ASPECT_WIDTH;
    let max_height = work_height * MAX_HEIGHT_FRACTION;
    if height > max_height {
        height = max_height;
        width = height * ASPECT_WIDTH / ASPECT_HEIGHT;
    }

    if packaged {
        width = width.max(PACKAGED_MIN_WIDTH);
        height = height.max(PACKAGED_MIN_HEIGHT);
    }

    WindowSize {
        width: width.round(),
        height: height.round(),
    }
}

pub fn minimum_window_size(packaged: bool) -> Option<WindowSize> {
    packaged.then_some(WindowSize {
        width: PACKAGED_MIN_WIDTH,
        height: PACKAGED_MIN_HEIGHT,
    })
}
