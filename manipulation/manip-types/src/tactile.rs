//! Tactile sensor samples.
//!
//! The fingertip sensor is an optical contact pad that reports, per frame, the
//! displacement of its contact pattern (shear) and a line fit of the contact
//! edge, both in image pixels. This module decodes the fixed-layout channel
//! vector and converts pixel quantities into metres on the pad.
//!
//! # Channel layout
//!
//! | Index | Channel |
//! |-------|---------|
//! | 0 | shear displacement x (px) |
//! | 1 | shear displacement y (px) |
//! | 2 | line centre x (px) |
//! | 3 | line centre y (px) |
//! | 4 | line eigenvector x |
//! | 5 | line eigenvector y |
//! | 6 | line eigenvalue |
//! | 7 | image height (px) |
//! | 8 | image width (px) |
//!
//! Extra trailing channels are ignored; a shorter vector is rejected.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ManipError, Result};

/// Physical width of the sensor pad in metres.
pub const PAD_WIDTH_M: f64 = 0.015_95;

/// Physical height of the sensor pad in metres.
pub const PAD_HEIGHT_M: f64 = 0.016_68;

/// Named channels of a tactile sample, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TactileChannel {
    /// Shear displacement along image x.
    ShearDisplacementX,
    /// Shear displacement along image y.
    ShearDisplacementY,
    /// Line-fit centre along image x.
    LineCenterX,
    /// Line-fit centre along image y.
    LineCenterY,
    /// Line-fit principal eigenvector, x component.
    LineEigenVecX,
    /// Line-fit principal eigenvector, y component.
    LineEigenVecY,
    /// Line-fit principal eigenvalue.
    LineEigenVal,
    /// Image height in pixels.
    ImageHeight,
    /// Image width in pixels.
    ImageWidth,
}

impl TactileChannel {
    /// Number of channels a well-formed sample carries.
    pub const COUNT: usize = 9;

    /// Returns the wire index of this channel.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One decoded tactile frame.
///
/// # Example
///
/// ```
/// use manip_types::{TactileChannel, TactileSample};
///
/// // Contact displaced straight along +x from the image centre.
/// let raw = [420.0, 240.0, 320.0, 240.0, 1.0, 0.0, 1.0, 480.0, 640.0];
/// let sample = TactileSample::from_raw(0.5, &raw).unwrap();
///
/// assert!(sample.shear_angle().abs() < 1e-12);
/// assert!(sample.shear_magnitude() > 0.0);
///
/// // Too few channels is a sensor fault.
/// assert!(TactileSample::from_raw(0.6, &raw[..4]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TactileSample {
    timestamp: f64,
    channels: [f64; TactileChannel::COUNT],
}

impl TactileSample {
    /// Decodes a raw channel vector.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::SensorFault`] if fewer than
    /// [`TactileChannel::COUNT`] channels are present, if any used channel is
    /// not finite, or if the image dimensions are not positive.
    pub fn from_raw(timestamp: f64, raw: &[f64]) -> Result<Self> {
        if raw.len() < TactileChannel::COUNT {
            return Err(ManipError::sensor_fault(format!(
                "expected {} channels, got {}",
                TactileChannel::COUNT,
                raw.len()
            )));
        }
        let mut channels = [0.0; TactileChannel::COUNT];
        channels.copy_from_slice(&raw[..TactileChannel::COUNT]);
        if channels.iter().any(|v| !v.is_finite()) {
            return Err(ManipError::sensor_fault("non-finite channel value"));
        }
        let sample = Self {
            timestamp,
            channels,
        };
        if sample.image_width() <= 0.0 || sample.image_height() <= 0.0 {
            return Err(ManipError::sensor_fault("image dimensions must be positive"));
        }
        Ok(sample)
    }

    /// Returns the sample timestamp in seconds.
    #[must_use]
    pub const fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Returns a single channel value.
    #[must_use]
    pub const fn channel(&self, channel: TactileChannel) -> f64 {
        self.channels[channel.index()]
    }

    /// Returns all channels in wire order.
    #[must_use]
    pub const fn channels(&self) -> &[f64; TactileChannel::COUNT] {
        &self.channels
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn image_width(&self) -> f64 {
        self.channel(TactileChannel::ImageWidth)
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn image_height(&self) -> f64 {
        self.channel(TactileChannel::ImageHeight)
    }

    /// Converts an image-pixel point into metres on the pad.
    #[must_use]
    pub fn pixel_to_metres(&self, x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(
            PAD_WIDTH_M * x / self.image_width(),
            PAD_HEIGHT_M * y / self.image_height(),
        )
    }

    /// Shear displacement from the image centre, in metres on the pad.
    #[must_use]
    pub fn shear_vector(&self) -> Vector2<f64> {
        let centre = self.pixel_to_metres(self.image_width() / 2.0, self.image_height() / 2.0);
        let displaced = self.pixel_to_metres(
            self.channel(TactileChannel::ShearDisplacementX),
            self.channel(TactileChannel::ShearDisplacementY),
        );
        displaced - centre
    }

    /// Angle of the shear displacement relative to the pad x axis, in radians.
    #[must_use]
    pub fn shear_angle(&self) -> f64 {
        let shear = self.shear_vector();
        shear.y.atan2(shear.x)
    }

    /// Magnitude of the shear displacement in metres.
    #[must_use]
    pub fn shear_magnitude(&self) -> f64 {
        self.shear_vector().norm()
    }

    /// Angle of the fitted contact line, folded into `(-π/2, π/2]`.
    #[must_use]
    pub fn line_angle(&self) -> f64 {
        let theta = self
            .channel(TactileChannel::LineEigenVecY)
            .atan2(self.channel(TactileChannel::LineEigenVecX));
        if theta > FRAC_PI_2 {
            theta - PI
        } else if theta <= -FRAC_PI_2 {
            theta + PI
        } else {
            theta
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(shear_x: f64, shear_y: f64) -> Vec<f64> {
        vec![shear_x, shear_y, 320.0, 240.0, 1.0, 0.0, 1.0, 480.0, 640.0]
    }

    #[test]
    fn test_channel_indices_follow_wire_order() {
        assert_eq!(TactileChannel::ShearDisplacementX.index(), 0);
        assert_eq!(TactileChannel::LineEigenVal.index(), 6);
        assert_eq!(TactileChannel::ImageWidth.index(), TactileChannel::COUNT - 1);
    }

    #[test]
    fn test_centered_contact_has_no_shear() {
        let sample = TactileSample::from_raw(0.0, &raw(320.0, 240.0)).unwrap();
        assert_relative_eq!(sample.shear_magnitude(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_shear_along_y() {
        let sample = TactileSample::from_raw(0.0, &raw(320.0, 480.0)).unwrap();
        assert_relative_eq!(sample.shear_angle(), FRAC_PI_2, epsilon = 1e-12);
        // Half the image height maps to half the pad height.
        assert_relative_eq!(sample.shear_magnitude(), PAD_HEIGHT_M / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pixel_conversion_at_full_frame() {
        let sample = TactileSample::from_raw(0.0, &raw(0.0, 0.0)).unwrap();
        let corner = sample.pixel_to_metres(640.0, 480.0);
        assert_relative_eq!(corner.x, PAD_WIDTH_M);
        assert_relative_eq!(corner.y, PAD_HEIGHT_M);
    }

    #[test]
    fn test_line_angle_folds() {
        let mut values = raw(320.0, 240.0);
        values[TactileChannel::LineEigenVecX.index()] = -1.0;
        values[TactileChannel::LineEigenVecY.index()] = 1.0;
        let sample = TactileSample::from_raw(0.0, &values).unwrap();
        assert_relative_eq!(sample.line_angle(), -PI / 4.0, epsilon = 1e-12);

        values[TactileChannel::LineEigenVecX.index()] = -1.0;
        values[TactileChannel::LineEigenVecY.index()] = -1.0;
        let sample = TactileSample::from_raw(0.0, &values).unwrap();
        assert_relative_eq!(sample.line_angle(), PI / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_short_and_bad_samples() {
        let err = TactileSample::from_raw(0.0, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ManipError::SensorFault(_)));

        let mut values = raw(0.0, 0.0);
        values[TactileChannel::ImageWidth.index()] = 0.0;
        assert!(TactileSample::from_raw(0.0, &values).is_err());

        values = raw(f64::NAN, 0.0);
        assert!(TactileSample::from_raw(0.0, &values).is_err());
    }

    #[test]
    fn test_extra_channels_ignored() {
        let mut values = raw(330.0, 240.0);
        values.push(99.0);
        let sample = TactileSample::from_raw(1.5, &values).unwrap();
        assert_relative_eq!(sample.timestamp(), 1.5);
        assert_relative_eq!(sample.channel(TactileChannel::ShearDisplacementX), 330.0);
    }
}
