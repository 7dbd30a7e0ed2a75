//! Tabular trajectory files for later playback.
//!
//! # Format
//!
//! Comma-separated text. The first row is a header: `time` followed by the
//! joint names. Every following row is one trajectory point: time from start
//! in seconds, then one position per joint. Values are written in Rust's
//! shortest round-trip form, so reloading reproduces them exactly.
//!
//! ```text
//! time,left_arm_x,left_arm_y
//! 0,0,0
//! 0.25,0.01,0
//! ```
//!
//! Velocities and accelerations are not stored; a reloaded trajectory is at
//! rest at every point and is normally re-timed before execution.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use manip_types::{
    ArmSide, ConfigurationTrajectory, ManipError, Result, TrajectoryPoint,
};
use tracing::info;

const TIME_COLUMN: &str = "time";

/// Writes a trajectory in playback format.
///
/// # Errors
///
/// Returns [`ManipError::Io`] if writing fails.
pub fn write_playback<W: Write>(mut writer: W, trajectory: &ConfigurationTrajectory) -> Result<()> {
    write!(writer, "{TIME_COLUMN}")?;
    for name in trajectory.joint_names() {
        write!(writer, ",{name}")?;
    }
    writeln!(writer)?;
    for point in trajectory.points() {
        write!(writer, "{}", point.time_from_start)?;
        for value in &point.positions {
            write!(writer, ",{value}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a playback file for the given arm.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`ManipError::Playback`] for a missing header, a row with the wrong
/// number of columns, or an unparsable number;
/// [`ManipError::InvalidTrajectory`] if the times are not strictly increasing;
/// [`ManipError::Io`] if reading fails.
pub fn read_playback<R: BufRead>(reader: R, side: ArmSide) -> Result<ConfigurationTrajectory> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(index, line)| line.map(|l| (index + 1, l)));

    let joint_names = loop {
        match lines.next() {
            None => return Err(ManipError::playback(1, "missing header row")),
            Some(line) => {
                let (number, text) = line?;
                if text.trim().is_empty() {
                    continue;
                }
                let mut columns = text.split(',').map(str::trim);
                if columns.next() != Some(TIME_COLUMN) {
                    return Err(ManipError::playback(
                        number,
                        format!("header must start with '{TIME_COLUMN}'"),
                    ));
                }
                break columns.map(str::to_string).collect::<Vec<_>>();
            }
        }
    };

    let mut points = Vec::new();
    for line in lines {
        let (number, text) = line?;
        if text.trim().is_empty() {
            continue;
        }
        let values = text
            .split(',')
            .map(|field| {
                field.trim().parse::<f64>().map_err(|e| {
                    ManipError::playback(number, format!("invalid number '{}': {e}", field.trim()))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != joint_names.len() + 1 {
            return Err(ManipError::playback(
                number,
                format!(
                    "expected {} columns, found {}",
                    joint_names.len() + 1,
                    values.len()
                ),
            ));
        }
        points.push(TrajectoryPoint::at_rest(values[1..].to_vec(), values[0]));
    }

    ConfigurationTrajectory::new(side, joint_names, points)
}

/// Saves a trajectory to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`ManipError::Io`] if the file cannot be written.
pub fn save_playback(path: impl AsRef<Path>, trajectory: &ConfigurationTrajectory) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_playback(BufWriter::new(file), trajectory)?;
    info!(
        path = %path.display(),
        points = trajectory.len(),
        "Saved trajectory"
    );
    Ok(())
}

/// Loads a trajectory for `side` from `path`.
///
/// # Errors
///
/// See [`read_playback`].
pub fn load_playback(path: impl AsRef<Path>, side: ArmSide) -> Result<ConfigurationTrajectory> {
    let file = File::open(path.as_ref())?;
    read_playback(BufReader::new(file), side)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> ConfigurationTrajectory {
        ConfigurationTrajectory::new(
            ArmSide::Left,
            vec!["j1".into(), "j2".into()],
            vec![
                TrajectoryPoint::at_rest(vec![0.0, -1.5], 0.0),
                TrajectoryPoint::at_rest(vec![0.1, 1.0 / 3.0], 0.25),
                TrajectoryPoint::at_rest(vec![0.2, std::f64::consts::PI], 0.5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_written_format() {
        let mut buffer = Vec::new();
        write_playback(&mut buffer, &sample()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,j1,j2"));
        assert_eq!(lines.next(), Some("0,0,-1.5"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_reload_is_exact() {
        let mut buffer = Vec::new();
        write_playback(&mut buffer, &sample()).unwrap();
        let loaded = read_playback(buffer.as_slice(), ArmSide::Left).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approach.csv");
        save_playback(&path, &sample()).unwrap();
        let loaded = load_playback(&path, ArmSide::Left).unwrap();
        assert_eq!(loaded.joint_names(), sample().joint_names());
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_missing_header() {
        let err = read_playback("".as_bytes(), ArmSide::Left).unwrap_err();
        assert!(matches!(err, ManipError::Playback { line: 1, .. }));

        let err = read_playback("t,j1\n0,0\n".as_bytes(), ArmSide::Left).unwrap_err();
        assert!(matches!(err, ManipError::Playback { line: 1, .. }));
    }

    #[test]
    fn test_bad_rows() {
        let err = read_playback("time,j1\n0,0\n1,0,0\n".as_bytes(), ArmSide::Left).unwrap_err();
        assert!(matches!(err, ManipError::Playback { line: 3, .. }));

        let err = read_playback("time,j1\n0,abc\n".as_bytes(), ArmSide::Left).unwrap_err();
        assert!(matches!(err, ManipError::Playback { line: 2, .. }));

        let err = read_playback("time,j1\n1,0\n0,0\n".as_bytes(), ArmSide::Left).unwrap_err();
        assert!(matches!(err, ManipError::InvalidTrajectory(_)));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let trajectory =
            read_playback("\ntime,j1\n\n0,0.5\n\n1,0.75\n".as_bytes(), ArmSide::Right).unwrap();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.side(), ArmSide::Right);
    }
}
