//! Frames, per-frame detections and the detector capabilities
//!
//! Circle finding is provided by an external [`ShapeDetector`]. The laser dot is
//! bright enough in the red channel that [`RedSpotDetector`] can find it with a
//! fixed threshold and a connected-component pass.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Image coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }
}

/// Best circle candidate in a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
}

impl Detection {
    pub fn new(x: i32, y: i32, radius: i32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Distance between the centers of two detections
    pub fn distance_to(&self, other: &Detection) -> f64 {
        self.center().distance_to(&other.center())
    }
}

/// One camera frame
///
/// `image` is laid out as (row, column, channel) with RGB channel order.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Array3<u8>,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(image: Array3<u8>, frame_number: u64) -> Self {
        Self {
            image,
            frame_number,
        }
    }

    /// Black RGB frame
    pub fn blank(width: usize, height: usize, frame_number: u64) -> Self {
        Self::new(Array3::zeros((height, width, 3)), frame_number)
    }

    pub fn width(&self) -> usize {
        self.image.dim().1
    }

    pub fn height(&self) -> usize {
        self.image.dim().0
    }
}

/// Source of camera frames
pub trait FrameSource: Send {
    /// Next frame, or `None` when the camera produced nothing usable this time
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Finds the largest circular target in a frame
pub trait ShapeDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Option<Detection>;
}

/// Finds the laser dot in a frame
pub trait SpotDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Option<Point>;
}

/// Laser dot finder working on the red channel
#[derive(Debug, Clone)]
pub struct RedSpotDetector {
    /// Red values at or above this are part of the dot
    pub threshold: u8,
    /// Blobs must be strictly larger than this many pixels
    pub min_area: usize,
}

impl Default for RedSpotDetector {
    fn default() -> Self {
        Self {
            threshold: 252,
            min_area: 5,
        }
    }
}

/// Pixel count and coordinate sums of one connected blob
#[derive(Debug, Clone, Copy, Default)]
struct Blob {
    area: usize,
    sum_x: usize,
    sum_y: usize,
}

impl RedSpotDetector {
    /// Collect all 8-connected blobs of set pixels in the mask
    fn blobs(mask: &Array2<bool>) -> Vec<Blob> {
        let (height, width) = mask.dim();
        let mut visited = Array2::from_elem((height, width), false);
        let mut blobs = Vec::new();
        let mut stack = Vec::new();

        for row in 0..height {
            for col in 0..width {
                if !mask[[row, col]] || visited[[row, col]] {
                    continue;
                }

                let mut blob = Blob::default();
                visited[[row, col]] = true;
                stack.push((row, col));

                while let Some((r, c)) = stack.pop() {
                    blob.area += 1;
                    blob.sum_x += c;
                    blob.sum_y += r;

                    let r_min = r.saturating_sub(1);
                    let r_max = (r + 1).min(height - 1);
                    let c_min = c.saturating_sub(1);
                    let c_max = (c + 1).min(width - 1);
                    for nr in r_min..=r_max {
                        for nc in c_min..=c_max {
                            if mask[[nr, nc]] && !visited[[nr, nc]] {
                                visited[[nr, nc]] = true;
                                stack.push((nr, nc));
                            }
                        }
                    }
                }

                blobs.push(blob);
            }
        }

        blobs
    }
}

impl SpotDetector for RedSpotDetector {
    fn detect(&mut self, frame: &Frame) -> Option<Point> {
        let (height, width, channels) = frame.image.dim();
        if channels == 0 || height == 0 || width == 0 {
            return None;
        }

        let mask = Array2::from_shape_fn((height, width), |(row, col)| {
            frame.image[[row, col, 0]] >= self.threshold
        });

        // Largest blob wins; ties keep the first one found in scan order
        let best = Self::blobs(&mask)
            .into_iter()
            .fold(None::<Blob>, |best, blob| match best {
                Some(b) if b.area >= blob.area => Some(b),
                _ => Some(blob),
            })?;

        if best.area <= self.min_area {
            return None;
        }

        Some(Point::new(
            (best.sum_x / best.area) as i32,
            (best.sum_y / best.area) as i32,
        ))
    }
}
