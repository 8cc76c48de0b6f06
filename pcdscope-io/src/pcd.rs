//! PCD (Point Cloud Data) decoding
//!
//! Supports the v0.7 header and all three data sections: `ascii`, `binary`
//! and `binary_compressed` (LZF, field-major). Positions are read from the
//! `x`, `y`, `z` fields and colors from a packed `rgb`/`rgba` field.

use std::io::{BufRead, Cursor, Read};

use pcdscope_core::{Color, Point3f, PointGeometry};

use crate::error::IoError;
use crate::lzf;
use crate::PointCloudDecoder;

/// PCD data format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

/// PCD field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdFieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PcdFieldType {
    fn from_type_and_size(type_str: &str, size: usize) -> Result<Self, IoError> {
        Ok(match (type_str, size) {
            ("I", 1) => PcdFieldType::I8,
            ("I", 2) => PcdFieldType::I16,
            ("I", 4) => PcdFieldType::I32,
            ("U", 1) => PcdFieldType::U8,
            ("U", 2) => PcdFieldType::U16,
            ("U", 4) => PcdFieldType::U32,
            ("F", 4) => PcdFieldType::F32,
            ("F", 8) => PcdFieldType::F64,
            _ => {
                return Err(IoError::parse(format!(
                    "Unknown field type/size combination: {}/{}",
                    type_str, size
                )))
            }
        })
    }

    /// Size of one value in bytes
    pub fn size(self) -> usize {
        match self {
            PcdFieldType::I8 | PcdFieldType::U8 => 1,
            PcdFieldType::I16 | PcdFieldType::U16 => 2,
            PcdFieldType::I32 | PcdFieldType::U32 | PcdFieldType::F32 => 4,
            PcdFieldType::F64 => 8,
        }
    }
}

/// PCD field definition
#[derive(Debug, Clone, PartialEq)]
pub struct PcdField {
    pub name: String,
    pub field_type: PcdFieldType,
    pub count: usize,
}

impl PcdField {
    /// Bytes this field occupies in one point record
    pub fn byte_len(&self) -> usize {
        self.field_type.size() * self.count
    }
}

/// PCD header information
#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<PcdField>,
    pub width: usize,
    pub height: usize,
    pub viewpoint: [f64; 7], // tx, ty, tz, qw, qx, qy, qz
    pub points: usize,
    pub data_format: PcdDataFormat,
}

impl PcdHeader {
    /// Bytes per point record in the binary layout
    pub fn record_len(&self) -> usize {
        self.fields.iter().map(PcdField::byte_len).sum()
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Byte offset of a field inside one binary record
    fn byte_offset(&self, index: usize) -> usize {
        self.fields[..index].iter().map(PcdField::byte_len).sum()
    }

    /// Token offset of a field inside one ascii line
    fn token_offset(&self, index: usize) -> usize {
        self.fields[..index].iter().map(|f| f.count).sum()
    }
}

/// Where the fields needed for a [`PointGeometry`] live in the header
struct FieldMap {
    x: usize,
    y: usize,
    z: usize,
    rgb: Option<usize>,
}

impl FieldMap {
    fn resolve(header: &PcdHeader) -> Result<Self, IoError> {
        let find = |name: &str| {
            header
                .field_index(name)
                .ok_or_else(|| IoError::parse(format!("Missing {} field in PCD header", name)))
        };
        Ok(Self {
            x: find("x")?,
            y: find("y")?,
            z: find("z")?,
            rgb: header
                .field_index("rgb")
                .or_else(|| header.field_index("rgba")),
        })
    }
}

/// Decoder for `.pcd` files
#[derive(Debug, Clone, Copy, Default)]
pub struct PcdDecoder;

impl PcdDecoder {
    /// Parse the header and the data section that follows it
    pub fn decode_bytes(bytes: &[u8]) -> Result<PointGeometry, IoError> {
        let mut reader = Cursor::new(bytes);
        let header = read_header(&mut reader)?;
        let body = &bytes[reader.position() as usize..];
        log::debug!(
            "PCD v{} header: {} points, {:?}, fields {:?}",
            header.version,
            header.points,
            header.data_format,
            header.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>()
        );

        let map = FieldMap::resolve(&header)?;
        match header.data_format {
            PcdDataFormat::Ascii => read_ascii(body, &header, &map),
            PcdDataFormat::Binary => read_binary(body, &header, &map),
            PcdDataFormat::BinaryCompressed => read_binary_compressed(body, &header, &map),
        }
    }
}

impl PointCloudDecoder for PcdDecoder {
    fn decode(&self, bytes: &[u8]) -> pcdscope_core::Result<PointGeometry> {
        Ok(Self::decode_bytes(bytes)?)
    }

    fn format_name(&self) -> &'static str {
        "pcd"
    }
}

/// Read PCD header, leaving `reader` at the first byte of the data section
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PcdHeader, IoError> {
    let mut version = None;
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut types: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut width = None;
    let mut height = None;
    let mut viewpoint = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
    let mut points = None;
    let data_format;

    let mut raw = Vec::new();
    loop {
        raw.clear();
        let bytes_read = reader.read_until(b'\n', &mut raw)?;
        if bytes_read == 0 {
            return Err(IoError::parse("Unexpected end of file in PCD header"));
        }

        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let values = &parts[1..];

        let parse_usize = |key: &str, value: &str| {
            value
                .parse::<usize>()
                .map_err(|_| IoError::parse(format!("Invalid {} value: {}", key, value)))
        };

        match parts[0].to_ascii_uppercase().as_str() {
            "VERSION" => version = values.first().map(|v| v.to_string()),
            "FIELDS" | "COLUMNS" => names = values.iter().map(|v| v.to_string()).collect(),
            "SIZE" => {
                sizes = values
                    .iter()
                    .map(|v| parse_usize("SIZE", *v))
                    .collect::<Result<_, _>>()?
            }
            "TYPE" => types = values.iter().map(|v| v.to_ascii_uppercase()).collect(),
            "COUNT" => {
                counts = values
                    .iter()
                    .map(|v| parse_usize("COUNT", *v))
                    .collect::<Result<_, _>>()?
            }
            "WIDTH" => width = values.first().map(|v| parse_usize("WIDTH", *v)).transpose()?,
            "HEIGHT" => height = values.first().map(|v| parse_usize("HEIGHT", *v)).transpose()?,
            "POINTS" => points = values.first().map(|v| parse_usize("POINTS", *v)).transpose()?,
            "VIEWPOINT" => {
                if values.len() >= 7 {
                    for (slot, value) in viewpoint.iter_mut().zip(values) {
                        *slot = value.parse::<f64>().map_err(|_| {
                            IoError::parse(format!("Invalid VIEWPOINT value: {}", value))
                        })?;
                    }
                }
            }
            "DATA" => {
                data_format = match values.first().map(|v| v.to_ascii_lowercase()).as_deref() {
                    Some("ascii") => PcdDataFormat::Ascii,
                    Some("binary") => PcdDataFormat::Binary,
                    Some("binary_compressed") => PcdDataFormat::BinaryCompressed,
                    other => {
                        return Err(IoError::parse(format!("Unknown DATA format: {:?}", other)))
                    }
                };
                break;
            }
            _ => {
                // Ignore unknown header fields
            }
        }
    }

    if names.is_empty() {
        return Err(IoError::parse("Missing FIELDS in PCD header"));
    }
    // COUNT is optional and defaults to one value per field
    if counts.is_empty() {
        counts = vec![1; names.len()];
    }
    if names.len() != sizes.len() || names.len() != types.len() || names.len() != counts.len() {
        return Err(IoError::parse(
            "Mismatch between FIELDS, SIZE, TYPE, and COUNT declarations",
        ));
    }

    let fields = names
        .into_iter()
        .zip(sizes)
        .zip(types)
        .zip(counts)
        .map(|(((name, size), type_str), count)| {
            Ok(PcdField {
                name,
                field_type: PcdFieldType::from_type_and_size(&type_str, size)?,
                count,
            })
        })
        .collect::<Result<Vec<_>, IoError>>()?;

    if let Some(field) = fields.iter().find(|f| f.count == 0) {
        return Err(IoError::parse(format!("Field {} has a COUNT of 0", field.name)));
    }
    // Every offset and length derived from the header is bounded by this sum
    fields
        .iter()
        .try_fold(0usize, |total, f| {
            f.field_type
                .size()
                .checked_mul(f.count)
                .and_then(|len| total.checked_add(len))
        })
        .ok_or_else(|| IoError::parse("PCD record length overflows"))?;

    let width = width.ok_or_else(|| IoError::parse("Missing WIDTH in PCD header"))?;
    let height = height.unwrap_or(1);
    let points = match points {
        Some(points) => points,
        None => width.checked_mul(height).ok_or_else(|| {
            IoError::parse(format!("PCD size {}x{} overflows", width, height))
        })?,
    };

    Ok(PcdHeader {
        version: version.unwrap_or_else(|| "0.7".to_string()),
        fields,
        width,
        height,
        viewpoint,
        points,
        data_format,
    })
}

/// Unpack a `0x??RRGGBB` value into a color
fn unpack_rgb(packed: u32) -> Color {
    Color::from_hex(packed & 0x00ff_ffff)
}

fn push_point(
    positions: &mut Vec<Point3f>,
    colors: &mut Option<Vec<Color>>,
    position: Point3f,
    color: Option<Color>,
) {
    // Organized clouds mark invalid points with NaN
    if position.iter().any(|c| c.is_nan()) {
        return;
    }
    positions.push(position);
    if let (Some(colors), Some(color)) = (colors.as_mut(), color) {
        colors.push(color);
    }
}

fn finish(positions: Vec<Point3f>, colors: Option<Vec<Color>>) -> Result<PointGeometry, IoError> {
    match colors {
        Some(colors) => PointGeometry::with_colors(positions, colors)
            .map_err(|e| IoError::parse(e.to_string())),
        None => Ok(PointGeometry::from_positions(positions)),
    }
}

/// Total byte length of `points` binary records
fn data_len(header: &PcdHeader) -> Result<usize, IoError> {
    header.record_len().checked_mul(header.points).ok_or_else(|| {
        IoError::parse(format!(
            "{} points of {} bytes overflow the address space",
            header.points,
            header.record_len()
        ))
    })
}

fn read_ascii(body: &[u8], header: &PcdHeader, map: &FieldMap) -> Result<PointGeometry, IoError> {
    // An ascii point takes at least one byte, whatever the header claims
    let capacity = header.points.min(body.len());
    let mut positions = Vec::with_capacity(capacity);
    let mut colors = map.rgb.map(|_| Vec::with_capacity(capacity));

    let x = header.token_offset(map.x);
    let y = header.token_offset(map.y);
    let z = header.token_offset(map.z);
    let rgb = map.rgb.map(|i| (header.token_offset(i), header.fields[i].field_type));

    let text = String::from_utf8_lossy(body);
    let mut read = 0;
    for line in text.lines() {
        if read == header.points {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        read += 1;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let token = |index: usize| -> Result<&str, IoError> {
            tokens
                .get(index)
                .copied()
                .ok_or_else(|| IoError::parse("Not enough values in ASCII PCD line"))
        };
        let float = |index: usize| -> Result<f32, IoError> {
            let t = token(index)?;
            t.parse::<f32>()
                .map_err(|_| IoError::parse(format!("Invalid float value: {}", t)))
        };

        let position = Point3f::new(float(x)?, float(y)?, float(z)?);
        let color = match rgb {
            Some((offset, field_type)) => {
                let t = token(offset)?;
                let packed = match field_type {
                    PcdFieldType::F32 | PcdFieldType::F64 => t
                        .parse::<f32>()
                        .map(f32::to_bits)
                        .map_err(|_| IoError::parse(format!("Invalid rgb value: {}", t)))?,
                    _ => t
                        .parse::<i64>()
                        .map(|v| v as u32)
                        .map_err(|_| IoError::parse(format!("Invalid rgb value: {}", t)))?,
                };
                Some(unpack_rgb(packed))
            }
            None => None,
        };
        push_point(&mut positions, &mut colors, position, color);
    }

    if read < header.points {
        return Err(IoError::parse(format!(
            "Expected {} ASCII points, found {}",
            header.points, read
        )));
    }
    finish(positions, colors)
}

/// Read the first value of a field at `offset`
fn scalar_at(bytes: &[u8], offset: usize, field_type: PcdFieldType) -> Result<f64, IoError> {
    let slice = bytes
        .get(offset..offset + field_type.size())
        .ok_or_else(|| IoError::parse("PCD data section is truncated"))?;
    let mut reader = slice;
    Ok(match field_type {
        PcdFieldType::I8 => slice[0] as i8 as f64,
        PcdFieldType::U8 => slice[0] as f64,
        PcdFieldType::I16 => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            i16::from_le_bytes(buf) as f64
        }
        PcdFieldType::U16 => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            u16::from_le_bytes(buf) as f64
        }
        PcdFieldType::I32 => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            i32::from_le_bytes(buf) as f64
        }
        PcdFieldType::U32 => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            u32::from_le_bytes(buf) as f64
        }
        PcdFieldType::F32 => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            f32::from_le_bytes(buf) as f64
        }
        PcdFieldType::F64 => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            f64::from_le_bytes(buf)
        }
    })
}

/// Read a packed rgb field as raw bits
fn packed_at(bytes: &[u8], offset: usize) -> Result<u32, IoError> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| IoError::parse("PCD data section is truncated"))?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Shared by both binary layouts: `offset(field, point)` gives the byte
/// position of a field's first value for a point.
fn read_records<F>(
    bytes: &[u8],
    header: &PcdHeader,
    map: &FieldMap,
    offset: F,
) -> Result<PointGeometry, IoError>
where
    F: Fn(usize, usize) -> usize,
{
    let capacity = header.points.min(bytes.len() / header.record_len().max(1));
    let mut positions = Vec::with_capacity(capacity);
    let mut colors = map.rgb.map(|_| Vec::with_capacity(capacity));
    let field_type = |index: usize| header.fields[index].field_type;

    for i in 0..header.points {
        let position = Point3f::new(
            scalar_at(bytes, offset(map.x, i), field_type(map.x))? as f32,
            scalar_at(bytes, offset(map.y, i), field_type(map.y))? as f32,
            scalar_at(bytes, offset(map.z, i), field_type(map.z))? as f32,
        );
        let color = match map.rgb {
            Some(index) => Some(unpack_rgb(packed_at(bytes, offset(index, i))?)),
            None => None,
        };
        push_point(&mut positions, &mut colors, position, color);
    }

    finish(positions, colors)
}

fn read_binary(body: &[u8], header: &PcdHeader, map: &FieldMap) -> Result<PointGeometry, IoError> {
    let record_len = header.record_len();
    let expected = data_len(header)?;
    if body.len() < expected {
        return Err(IoError::parse(format!(
            "Binary PCD data is {} bytes, expected {}",
            body.len(),
            expected
        )));
    }
    read_records(body, header, map, |field, point| {
        point * record_len + header.byte_offset(field)
    })
}

fn read_binary_compressed(
    body: &[u8],
    header: &PcdHeader,
    map: &FieldMap,
) -> Result<PointGeometry, IoError> {
    if body.len() < 8 {
        return Err(IoError::parse("binary_compressed PCD is missing its size prefix"));
    }
    let compressed_len = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let decompressed_len = u32::from_le_bytes([body[4], body[5], body[6], body[7]]) as usize;
    let compressed = body[8..].get(..compressed_len).ok_or_else(|| {
        IoError::parse(format!(
            "binary_compressed PCD declares {} bytes but only {} follow",
            compressed_len,
            body.len() - 8
        ))
    })?;

    let expected = data_len(header)?;
    if decompressed_len < expected {
        return Err(IoError::parse(format!(
            "binary_compressed PCD holds {} bytes, expected {}",
            decompressed_len, expected
        )));
    }
    let data = lzf::decompress(compressed, decompressed_len)?;

    // Field-major: all values of the first field, then the second, ...
    let points = header.points;
    read_records(&data, header, map, |field, point| {
        header.byte_offset(field) * points + point * header.fields[field].byte_len()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const XYZ_HEADER: &str = "# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
";

    fn xyz_rgb_header(format: &str, points: usize) -> String {
        format!(
            "VERSION 0.7
FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F F
COUNT 1 1 1 1
WIDTH {points}
HEIGHT 1
POINTS {points}
DATA {format}
"
        )
    }

    fn packed_rgb(r: u8, g: u8, b: u8) -> f32 {
        f32::from_bits(u32::from_be_bytes([0, r, g, b]))
    }

    /// LZF stream made only of literal runs
    fn lzf_literals(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in data.chunks(32) {
            out.push((chunk.len() - 1) as u8);
            out.extend_from_slice(chunk);
        }
        out
    }

    #[test]
    fn test_ascii_positions_without_color() {
        let file = format!("{XYZ_HEADER}DATA ascii\n0 0 0\n1 2 3\n-1.5 0.5 4\n");
        let geometry = PcdDecoder::decode_bytes(file.as_bytes()).unwrap();
        assert_eq!(geometry.len(), 3);
        assert!(!geometry.has_colors());
        assert_relative_eq!(geometry.positions()[2], Point3f::new(-1.5, 0.5, 4.0));
    }

    #[test]
    fn test_ascii_packed_float_rgb() {
        let rgb = packed_rgb(255, 0, 128);
        let file = format!(
            "{}1 2 3 {:e}\n4 5 6 {:e}\n",
            xyz_rgb_header("ascii", 2),
            rgb,
            packed_rgb(0, 255, 0)
        );
        let geometry = PcdDecoder::decode_bytes(file.as_bytes()).unwrap();
        let colors = geometry.colors().unwrap();
        assert_eq!(colors.len(), 2);
        assert_relative_eq!(colors[0].r, 1.0);
        assert_relative_eq!(colors[0].g, 0.0);
        assert_relative_eq!(colors[0].b, 128.0 / 255.0);
        assert_relative_eq!(colors[1].g, 1.0);
    }

    #[test]
    fn test_ascii_unsigned_rgb() {
        let file = "VERSION 0.7
FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F U
WIDTH 1
POINTS 1
DATA ascii
0 0 0 16711680
";
        let geometry = PcdDecoder::decode_bytes(file.as_bytes()).unwrap();
        assert_eq!(geometry.colors().unwrap()[0], Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_binary_with_color() {
        let mut file = xyz_rgb_header("binary", 2).into_bytes();
        for (p, rgb) in [([1.0f32, 2.0, 3.0], [10u8, 20, 30]), ([4.0, 5.0, 6.0], [255, 255, 255])] {
            for c in p {
                file.extend_from_slice(&c.to_le_bytes());
            }
            file.extend_from_slice(&packed_rgb(rgb[0], rgb[1], rgb[2]).to_le_bytes());
        }

        let geometry = PcdDecoder::decode_bytes(&file).unwrap();
        assert_eq!(geometry.positions(), &[Point3f::new(1.0, 2.0, 3.0), Point3f::new(4.0, 5.0, 6.0)]);
        let colors = geometry.colors().unwrap();
        assert_eq!(colors[0], Color::from_rgb8([10, 20, 30]));
        assert_eq!(colors[1], Color::WHITE);
    }

    #[test]
    fn test_binary_skips_nan_points() {
        let mut file = format!("{XYZ_HEADER}DATA binary\n").into_bytes();
        for c in [0.0f32, 0.0, 0.0, f32::NAN, f32::NAN, f32::NAN, 1.0, 1.0, 1.0] {
            file.extend_from_slice(&c.to_le_bytes());
        }
        let geometry = PcdDecoder::decode_bytes(&file).unwrap();
        assert_eq!(geometry.len(), 2);
    }

    #[test]
    fn test_binary_truncated_is_an_error() {
        let mut file = format!("{XYZ_HEADER}DATA binary\n").into_bytes();
        file.extend_from_slice(&1.0f32.to_le_bytes());
        let result = PcdDecoder::decode_bytes(&file);
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_binary_compressed_field_major() {
        let points = [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let colors = [packed_rgb(255, 0, 0), packed_rgb(0, 0, 255)];

        let mut raw = Vec::new();
        for axis in 0..3 {
            for p in &points {
                raw.extend_from_slice(&p[axis].to_le_bytes());
            }
        }
        for c in &colors {
            raw.extend_from_slice(&c.to_le_bytes());
        }
        let compressed = lzf_literals(&raw);

        let mut file = xyz_rgb_header("binary_compressed", 2).into_bytes();
        file.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        file.extend_from_slice(&(raw.len() as u32).to_le_bytes());
        file.extend_from_slice(&compressed);

        let geometry = PcdDecoder::decode_bytes(&file).unwrap();
        assert_eq!(geometry.positions()[1], Point3f::new(4.0, 5.0, 6.0));
        assert_eq!(geometry.colors().unwrap()[0], Color::new(1.0, 0.0, 0.0));
        assert_eq!(geometry.colors().unwrap()[1], Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_header_requires_xyz() {
        let file = "VERSION 0.7
FIELDS intensity
SIZE 4
TYPE F
COUNT 1
WIDTH 1
POINTS 1
DATA ascii
0.5
";
        let result = PcdDecoder::decode_bytes(file.as_bytes());
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_header_mismatched_declarations() {
        let file = "VERSION 0.7
FIELDS x y z
SIZE 4 4
TYPE F F F
WIDTH 1
DATA ascii
0 0 0
";
        assert!(PcdDecoder::decode_bytes(file.as_bytes()).is_err());
    }

    #[test]
    fn test_header_parses_viewpoint_and_counts() {
        let text = "VERSION .7
FIELDS x y z normal
SIZE 4 4 4 4
TYPE F F F F
COUNT 1 1 1 3
WIDTH 4
HEIGHT 2
VIEWPOINT 1 2 3 1 0 0 0
DATA binary
";
        let header = read_header(&mut Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(header.points, 8);
        assert_eq!(header.fields[3].count, 3);
        assert_eq!(header.record_len(), 24);
        assert_eq!(header.viewpoint[..3], [1.0, 2.0, 3.0]);
        assert_eq!(header.data_format, PcdDataFormat::Binary);
    }

    fn xyz_header(format: &str, points: &str) -> String {
        format!(
            "VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
WIDTH 1
HEIGHT 1
POINTS {points}
DATA {format}
"
        )
    }

    #[test]
    fn test_ascii_huge_point_count_is_an_error() {
        let file = format!("{}0 0 0\n", xyz_header("ascii", "1000000000000000"));
        let result = PcdDecoder::decode_bytes(file.as_bytes());
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_binary_huge_point_count_is_an_error() {
        let mut file = xyz_header("binary", "1000000000000000").into_bytes();
        file.extend_from_slice(&[0u8; 12]);
        let result = PcdDecoder::decode_bytes(&file);
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_binary_point_count_overflowing_record_length_is_an_error() {
        let mut file = xyz_header("binary", &usize::MAX.to_string()).into_bytes();
        file.extend_from_slice(&[0u8; 12]);
        let result = PcdDecoder::decode_bytes(&file);
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_compressed_huge_point_count_is_an_error() {
        let compressed = lzf_literals(&[0u8; 12]);
        let mut file = xyz_header("binary_compressed", "1000000000000000").into_bytes();
        file.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        file.extend_from_slice(&12u32.to_le_bytes());
        file.extend_from_slice(&compressed);
        let result = PcdDecoder::decode_bytes(&file);
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_compressed_declared_size_larger_than_stream_is_an_error() {
        let compressed = lzf_literals(&[0u8; 12]);
        let mut file = xyz_header("binary_compressed", "1").into_bytes();
        file.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        file.extend_from_slice(&u32::MAX.to_le_bytes());
        file.extend_from_slice(&compressed);
        let result = PcdDecoder::decode_bytes(&file);
        assert!(matches!(result, Err(IoError::Decompression { .. })));
    }

    #[test]
    fn test_header_width_times_height_overflow_is_an_error() {
        let text = format!(
            "VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
WIDTH {}
HEIGHT 2
DATA ascii
",
            usize::MAX
        );
        let result = read_header(&mut Cursor::new(text.as_bytes()));
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_header_field_count_overflow_is_an_error() {
        let text = format!(
            "VERSION 0.7
FIELDS x y z normal
SIZE 4 4 4 4
TYPE F F F F
COUNT 1 1 1 {}
WIDTH 1
DATA binary
",
            usize::MAX
        );
        let result = read_header(&mut Cursor::new(text.as_bytes()));
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_header_zero_count_is_an_error() {
        let text = "VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 0 1
WIDTH 1
DATA binary
";
        let result = read_header(&mut Cursor::new(text.as_bytes()));
        assert!(matches!(result, Err(IoError::ParseError { .. })));
    }
}
