//! `hexnav-perception` – classical-vision obstacle detection.
//!
//! Turns one camera [`Frame`][hexnav_types::Frame] into a
//! [`DangerAssessment`][classifier::DangerAssessment] without learned models
//! or GPU: three cheap hazard signals are fused, segmented into obstacle
//! candidates and graded per zone.
//!
//! # Modules
//!
//! - [`roi`] – [`partition`][roi::partition]: carves the detection band out of
//!   the frame and splits it into LEFT / CENTER / RIGHT zones.
//! - [`raster`] – [`Plane`][raster::Plane] and [`Mask`][raster::Mask]: the
//!   8-bit and binary buffers the extractors work on (blur, 3×3 kernels,
//!   morphology, hole filling).
//! - [`signals`] – [`SignalSet`][signals::SignalSet]: saturation, Laplacian
//!   contrast and Canny edge masks.
//! - [`segment`] – [`fuse`][segment::fuse] and [`segment`][segment::segment]:
//!   mask fusion and connected components → [`ObstacleCandidate`][segment::ObstacleCandidate].
//! - [`classifier`] – [`classify`][classifier::classify]: per-zone thresholds
//!   → global danger level.
//! - [`detector`] – [`ObstacleDetector`][detector::ObstacleDetector]: the
//!   whole pipeline behind one call.
//! - [`annotate`] – diagnostic overlay rendered into an `image::RgbImage`.

pub mod annotate;
pub mod classifier;
pub mod detector;
pub mod raster;
pub mod roi;
pub mod segment;
pub mod signals;

pub use classifier::DangerAssessment;
pub use detector::{Detection, ObstacleDetector};
pub use segment::{BoundingBox, ObstacleCandidate, SizeClass};
