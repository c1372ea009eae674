//! Minimal PLY reader for polygon meshes.
//!
//! Supports `ascii` and `binary_little_endian` bodies, any scalar property
//! type, and list properties. Only vertex positions, optional texture
//! coordinates and face index lists are kept.

use std::path::Path;

use crate::error::RenderError;
use crate::io;

/// Reasons a PLY file is rejected.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PlyError {
    #[error("missing 'ply' magic")]
    MissingMagic,

    #[error("missing end_header")]
    MissingEndHeader,

    #[error("missing format line")]
    MissingFormat,

    #[error("unsupported PLY format '{0}'")]
    UnsupportedFormat(String),

    #[error("unsupported property type '{0}'")]
    UnsupportedType(String),

    #[error("invalid element count '{0}'")]
    InvalidCount(String),

    #[error("property declared before any element")]
    OrphanProperty,

    #[error("unrecognized header line '{0}'")]
    UnrecognizedLine(String),

    #[error("file has no {0} element")]
    MissingElement(&'static str),

    #[error("{element} element lacks {property}")]
    MissingProperty {
        element: &'static str,
        property: &'static str,
    },

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("ascii body is not UTF-8")]
    NotUtf8,

    #[error("negative list length in '{0}'")]
    NegativeLength(String),

    #[error("negative vertex index {0}")]
    NegativeIndex(f64),

    #[error("face references vertex {index} but only {count} vertices exist")]
    IndexOutOfRange { index: u32, count: u32 },
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyDataType {
    Float32,
    Float64,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
}

impl PlyDataType {
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            other => Err(PlyError::UnsupportedType(other.to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
enum PropertyKind {
    Scalar(PlyDataType),
    List { count: PlyDataType, item: PlyDataType },
}

#[derive(Debug, PartialEq, Clone)]
struct PropertyDefinition {
    name: String,
    kind: PropertyKind,
}

#[derive(Debug, PartialEq, Clone)]
struct ElementDefinition {
    name: String,
    count: usize,
    properties: Vec<PropertyDefinition>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Debug)]
struct PlyHeader {
    format: PlyFormat,
    elements: Vec<ElementDefinition>,
}

/// Polygon mesh as stored in the file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlyMesh {
    pub positions: Vec<[f32; 3]>,
    /// Present only when every vertex carries texture coordinates.
    pub uvs: Option<Vec<[f32; 2]>>,
    pub faces: Vec<Vec<u32>>,
}

const TEXCOORD_NAMES: [(&str, &str); 3] = [("u", "v"), ("s", "t"), ("texture_u", "texture_v")];

fn parse_header(text: &str) -> Result<PlyHeader, PlyError> {
    let mut lines = text.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err(PlyError::MissingMagic);
    }

    let mut format = None;
    let mut elements: Vec<ElementDefinition> = Vec::new();

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["format", "ascii", ..] => format = Some(PlyFormat::Ascii),
            ["format", "binary_little_endian", ..] => format = Some(PlyFormat::BinaryLittleEndian),
            ["format", other, ..] => return Err(PlyError::UnsupportedFormat(other.to_string())),
            ["comment", ..] | ["obj_info", ..] | [] => {}
            ["element", name, count] => elements.push(ElementDefinition {
                name: name.to_string(),
                count: count
                    .parse()
                    .map_err(|_| PlyError::InvalidCount(count.to_string()))?,
                properties: Vec::new(),
            }),
            ["property", "list", count, item, name] => {
                let element = elements
                    .last_mut()
                    .ok_or(PlyError::OrphanProperty)?;
                element.properties.push(PropertyDefinition {
                    name: name.to_string(),
                    kind: PropertyKind::List {
                        count: PlyDataType::parse(count)?,
                        item: PlyDataType::parse(item)?,
                    },
                });
            }
            ["property", ty, name] => {
                let element = elements
                    .last_mut()
                    .ok_or(PlyError::OrphanProperty)?;
                element.properties.push(PropertyDefinition {
                    name: name.to_string(),
                    kind: PropertyKind::Scalar(PlyDataType::parse(ty)?),
                });
            }
            ["end_header"] => break,
            _ => return Err(PlyError::UnrecognizedLine(line.to_string())),
        }
    }

    let format = format.ok_or(PlyError::MissingFormat)?;
    Ok(PlyHeader { format, elements })
}

/// Sequential reader over the body, independent of encoding.
trait ValueSource {
    fn read(&mut self, ty: PlyDataType) -> Result<f64, PlyError>;
}

struct BinarySource<'a> {
    data: &'a [u8],
    offset: usize,
}

impl ValueSource for BinarySource<'_> {
    fn read(&mut self, ty: PlyDataType) -> Result<f64, PlyError> {
        let size = ty.size();
        let bytes = self
            .data
            .get(self.offset..self.offset + size)
            .ok_or(PlyError::UnexpectedEof)?;
        self.offset += size;

        let mut buf = [0u8; 8];
        buf[..size].copy_from_slice(bytes);
        Ok(match ty {
            PlyDataType::Float32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            PlyDataType::Float64 => f64::from_le_bytes(buf),
            PlyDataType::Int8 => buf[0] as i8 as f64,
            PlyDataType::UInt8 => buf[0] as f64,
            PlyDataType::Int16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
            PlyDataType::UInt16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
            PlyDataType::Int32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            PlyDataType::UInt32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        })
    }
}

struct AsciiSource<'a> {
    tokens: std::str::SplitWhitespace<'a>,
}

impl ValueSource for AsciiSource<'_> {
    fn read(&mut self, _ty: PlyDataType) -> Result<f64, PlyError> {
        let token = self.tokens.next().ok_or(PlyError::UnexpectedEof)?;
        token
            .parse::<f64>()
            .map_err(|_| PlyError::InvalidNumber(token.to_string()))
    }
}

fn read_body(header: &PlyHeader, source: &mut dyn ValueSource) -> Result<PlyMesh, PlyError> {
    let mut mesh = PlyMesh::default();
    let mut uvs = Vec::new();
    let mut has_uvs = false;

    for element in &header.elements {
        let names: Vec<&str> = element.properties.iter().map(|p| p.name.as_str()).collect();
        let position_slots = ["x", "y", "z"].map(|n| names.iter().position(|name| *name == n));
        let uv_slots = TEXCOORD_NAMES.iter().find_map(|(u, v)| {
            let u = names.iter().position(|name| name == u)?;
            let v = names.iter().position(|name| name == v)?;
            Some((u, v))
        });
        let index_slot = names
            .iter()
            .position(|name| *name == "vertex_indices" || *name == "vertex_index");

        let is_vertex = element.name == "vertex";
        let is_face = element.name == "face";
        if is_vertex {
            if position_slots.iter().any(Option::is_none) {
                return Err(PlyError::MissingProperty {
                    element: "vertex",
                    property: "x/y/z",
                });
            }
            has_uvs = uv_slots.is_some();
        }
        if is_face && index_slot.is_none() {
            return Err(PlyError::MissingProperty {
                element: "face",
                property: "vertex_indices",
            });
        }

        // Counts come from the header and are not trusted for allocation;
        // a short body fails on the first missing value.

        let mut scalars = vec![0.0f64; element.properties.len()];
        for _ in 0..element.count {
            let mut indices = Vec::new();
            for (slot, property) in element.properties.iter().enumerate() {
                match property.kind {
                    PropertyKind::Scalar(ty) => scalars[slot] = source.read(ty)?,
                    PropertyKind::List { count, item } => {
                        let len = source.read(count)?;
                        if len < 0.0 {
                            return Err(PlyError::NegativeLength(property.name.clone()));
                        }
                        let keep = is_face && Some(slot) == index_slot;
                        for _ in 0..len as usize {
                            let value = source.read(item)?;
                            if keep {
                                if value < 0.0 {
                                    return Err(PlyError::NegativeIndex(value));
                                }
                                indices.push(value as u32);
                            }
                        }
                    }
                }
            }

            if is_vertex {
                let [x, y, z] = position_slots.map(|slot| slot.map(|s| scalars[s] as f32).unwrap_or(0.0));
                mesh.positions.push([x, y, z]);
                if let Some((u, v)) = uv_slots {
                    uvs.push([scalars[u] as f32, scalars[v] as f32]);
                }
            } else if is_face {
                mesh.faces.push(indices);
            }
        }
    }

    if !header.elements.iter().any(|e| e.name == "vertex") {
        return Err(PlyError::MissingElement("vertex"));
    }
    if !header.elements.iter().any(|e| e.name == "face") {
        return Err(PlyError::MissingElement("face"));
    }

    let vertex_count = mesh.positions.len() as u32;
    if let Some(&index) = mesh.faces.iter().flatten().find(|&&i| i >= vertex_count) {
        return Err(PlyError::IndexOutOfRange {
            index,
            count: vertex_count,
        });
    }

    if has_uvs {
        mesh.uvs = Some(uvs);
    }
    Ok(mesh)
}

/// Parses a whole PLY file held in memory.
pub fn parse_ply(data: &[u8]) -> Result<PlyMesh, PlyError> {
    const END: &[u8] = b"end_header";
    let end = data
        .windows(END.len())
        .position(|w| w == END)
        .ok_or(PlyError::MissingEndHeader)?;
    // The body starts after the newline that terminates end_header.
    let body_start = data[end..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| end + p + 1)
        .unwrap_or(data.len());

    let header_text = String::from_utf8_lossy(&data[..body_start]);
    let header = parse_header(&header_text)?;
    let body = &data[body_start..];

    match header.format {
        PlyFormat::BinaryLittleEndian => {
            let mut source = BinarySource {
                data: body,
                offset: 0,
            };
            read_body(&header, &mut source)
        }
        PlyFormat::Ascii => {
            let text = std::str::from_utf8(body).map_err(|_| PlyError::NotUtf8)?;
            let mut source = AsciiSource {
                tokens: text.split_whitespace(),
            };
            read_body(&header, &mut source)
        }
    }
}

pub fn read_ply(path: &Path) -> Result<PlyMesh, RenderError> {
    let data = io::load_binary(path)?;
    parse_ply(&data).map_err(|err| RenderError::mesh(path, err.to_string()))
}
