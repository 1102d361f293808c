use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Floats per point: x, y, r, g, b.
pub const POINT_COMPONENTS: usize = 5;

/// Indices per triangle.
pub const TRIANGLE_CORNERS: usize = 3;

/// Vertex and index data loaded from a geometry file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Interleaved `x y r g b` floats.
    pub points: Vec<f32>,
    /// Triangle corners, three per triangle.
    pub indices: Vec<u16>,
}

impl Geometry {
    /// Number of points, as a GPU draw count.
    pub fn vertex_count(&self) -> Result<u32, GeometryError> {
        count_u32(self.points.len() / POINT_COMPONENTS, "points")
    }

    /// Number of indices, as a GPU draw count.
    pub fn index_count(&self) -> Result<u32, GeometryError> {
        count_u32(self.indices.len(), "indices")
    }
}

fn count_u32(count: usize, section: &'static str) -> Result<u32, GeometryError> {
    u32::try_from(count).map_err(|_| GeometryError::TooLarge { section, count })
}

/// A geometry file could not be read or parsed.
#[derive(Debug)]
pub enum GeometryError {
    Io { path: PathBuf, source: io::Error },
    /// A data line had the wrong number of values for its section.
    FieldCount {
        line: usize,
        section: &'static str,
        expected: usize,
        found: usize,
    },
    /// A value did not parse as the section's element type.
    InvalidValue {
        line: usize,
        section: &'static str,
        token: String,
    },
    /// A section holds more entries than a draw call can address.
    TooLarge { section: &'static str, count: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "could not read geometry file {}: {source}", path.display())
            }
            Self::FieldCount {
                line,
                section,
                expected,
                found,
            } => write!(
                f,
                "geometry line {line}: [{section}] entries take {expected} values, found {found}"
            ),
            Self::InvalidValue {
                line,
                section,
                token,
            } => write!(f, "geometry line {line}: invalid [{section}] value `{token}`"),
            Self::TooLarge { section, count } => {
                write!(f, "geometry [{section}] has {count} entries; at most {} can be drawn", u32::MAX)
            }
        }
    }
}

impl std::error::Error for GeometryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Section {
    None,
    Points,
    Indices,
}

/// Reads and parses the geometry file at `path`.
pub fn load_geometry(path: impl AsRef<Path>) -> Result<Geometry, GeometryError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| GeometryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let geometry = parse_geometry(&text)?;
    log::debug!(
        "loaded {}: {} points, {} indices",
        path.display(),
        geometry.points.len() / POINT_COMPONENTS,
        geometry.indices.len()
    );
    Ok(geometry)
}

/// Parses the sectioned geometry format.
///
/// ```text
/// [points]
/// # x     y     r   g   b
/// -0.5  -0.5   1.0 0.0 0.0
/// [indices]
/// 0 1 2
/// ```
///
/// Blank lines and lines starting with `#` are skipped anywhere. Lines
/// outside a known section are ignored.
pub fn parse_geometry(text: &str) -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry::default();
    let mut section = Section::None;

    for (i, raw) in text.split('\n').enumerate() {
        let number = i + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw).trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line {
            "[points]" => section = Section::Points,
            "[indices]" => section = Section::Indices,
            _ if line.starts_with('[') => {
                log::warn!("geometry line {number}: unknown section {line}; skipping its contents");
                section = Section::None;
            }
            _ => match section {
                Section::Points => parse_fields::<f32, POINT_COMPONENTS>(
                    line,
                    number,
                    "points",
                    &mut geometry.points,
                )?,
                Section::Indices => parse_fields::<u16, TRIANGLE_CORNERS>(
                    line,
                    number,
                    "indices",
                    &mut geometry.indices,
                )?,
                Section::None => {}
            },
        }
    }

    Ok(geometry)
}

fn parse_fields<T: FromStr, const N: usize>(
    line: &str,
    number: usize,
    section: &'static str,
    out: &mut Vec<T>,
) -> Result<(), GeometryError> {
    let found = line.split_whitespace().count();
    if found != N {
        return Err(GeometryError::FieldCount {
            line: number,
            section,
            expected: N,
            found,
        });
    }

    for token in line.split_whitespace() {
        let value = token.parse::<T>().map_err(|_| GeometryError::InvalidValue {
            line: number,
            section,
            token: token.to_owned(),
        })?;
        out.push(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const QUADS: &str = "\
[points]
# x     y      r    g    b
-0.5  -0.5    1.0  0.0  0.0
 0.5  -0.5    0.0  1.0  0.0
 0.5   0.5    0.0  0.0  1.0
-0.5   0.5    1.0  1.0  0.0
 0.0   0.9    1.0  0.0  1.0
 0.0  -0.9    0.0  1.0  1.0

[indices]
0 1 2
0 2 3
";

    // ── counts ────────────────────────────────────────────────────────────

    #[test]
    fn six_points_two_triangles() {
        let g = parse_geometry(QUADS).unwrap();
        assert_eq!(g.points.len(), 30);
        assert_eq!(g.indices.len(), 6);
        assert_eq!(g.vertex_count().unwrap(), 6);
        assert_eq!(g.index_count().unwrap(), 6);
        assert_eq!(&g.points[..5], &[-0.5, -0.5, 1.0, 0.0, 0.0]);
        assert_eq!(g.indices, [0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn empty_indices_section() {
        let g = parse_geometry("[points]\n0 0 1 1 1\n1 0 1 1 1\n0 1 1 1 1\n[indices]\n").unwrap();
        assert_eq!(g.points.len(), 15);
        assert!(g.indices.is_empty());
        assert_eq!(g.index_count().unwrap(), 0);
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_geometry("").unwrap(), Geometry::default());
    }

    // ── line endings / comments ───────────────────────────────────────────

    #[test]
    fn crlf_matches_lf() {
        let crlf = QUADS.replace('\n', "\r\n");
        assert_eq!(parse_geometry(&crlf).unwrap(), parse_geometry(QUADS).unwrap());
    }

    #[test]
    fn interleaved_blank_and_comment_lines() {
        let noisy = "\
# header comment\r
\r
[points]\r
# first\r
-0.5  -0.5    1.0  0.0  0.0\r
\r
 0.5  -0.5    0.0  1.0  0.0\r
# between\r
 0.5   0.5    0.0  0.0  1.0\r
-0.5   0.5    1.0  1.0  0.0\r
\r
 0.0   0.9    1.0  0.0  1.0\r
 0.0  -0.9    0.0  1.0  1.0\r
[indices]\r
\r
0 1 2\r
# last triangle\r
0 2 3\r
\r
";
        assert_eq!(parse_geometry(noisy).unwrap(), parse_geometry(QUADS).unwrap());
    }

    #[test]
    fn lines_outside_sections_are_ignored() {
        let g = parse_geometry("stray 1 2\n[points]\n1 2 3 4 5\n[colors]\n9 9 9\n").unwrap();
        assert_eq!(g.points, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(g.indices.is_empty());
    }

    // ── malformed input ───────────────────────────────────────────────────

    #[test]
    fn short_point_line_is_rejected() {
        let err = parse_geometry("[points]\n1 2 3 4\n").unwrap_err();
        assert!(matches!(
            err,
            GeometryError::FieldCount {
                line: 2,
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn index_out_of_u16_range_is_rejected() {
        let err = parse_geometry("[indices]\n0 1 70000\n").unwrap_err();
        match err {
            GeometryError::InvalidValue { line, token, .. } => {
                assert_eq!(line, 2);
                assert_eq!(token, "70000");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_point_is_rejected() {
        assert!(parse_geometry("[points]\n1 2 red 4 5\n").is_err());
    }

    // ── draw counts ───────────────────────────────────────────────────────

    #[test]
    fn counts_fit_u32() {
        assert_eq!(count_u32(u32::MAX as usize, "indices").unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn count_beyond_u32_is_rejected() {
        let err = count_u32(u32::MAX as usize + 1, "points").unwrap_err();
        match err {
            GeometryError::TooLarge { section, count } => {
                assert_eq!(section, "points");
                assert_eq!(count, u32::MAX as usize + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ── files ─────────────────────────────────────────────────────────────

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(QUADS.as_bytes()).unwrap();

        let g = load_geometry(file.path()).unwrap();
        assert_eq!(g.points.len(), 30);
        assert_eq!(g.indices.len(), 6);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_geometry(dir.path().join("absent.txt")).unwrap_err();

        assert!(matches!(err, GeometryError::Io { .. }));
        assert!(err.to_string().contains("absent.txt"));
    }
}
