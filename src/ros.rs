//! The robot message type universe: scalar kinds, width bounds, field type
//! tokens, and the validated type table.

use std::collections::BTreeMap;

use crate::error::Error;

/// The builtin header record type.
pub(crate) const HEADER_TYPE: &str = "std_msgs/Header";

/// Integer field kinds, one per declared width alias.
///
/// `Char` shares bounds with `Uint8` and `Byte` with `Int8`; they are kept as
/// distinct kinds because each alias names its own sampler in emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntType {
    /// Unsigned 8-bit, alias `char`.
    Char,
    /// Signed 8-bit, alias `byte`.
    Byte,
    /// Unsigned 8-bit.
    Uint8,
    /// Signed 8-bit.
    Int8,
    /// Unsigned 16-bit.
    Uint16,
    /// Signed 16-bit.
    Int16,
    /// Unsigned 32-bit.
    Uint32,
    /// Signed 32-bit.
    Int32,
    /// Unsigned 64-bit.
    Uint64,
    /// Signed 64-bit.
    Int64,
}

impl IntType {
    /// All integer kinds, in declaration order.
    pub const ALL: [IntType; 10] = [
        IntType::Char,
        IntType::Byte,
        IntType::Uint8,
        IntType::Int8,
        IntType::Uint16,
        IntType::Int16,
        IntType::Uint32,
        IntType::Int32,
        IntType::Uint64,
        IntType::Int64,
    ];

    /// The declared alias name.
    pub fn name(&self) -> &'static str {
        match self {
            IntType::Char => "char",
            IntType::Byte => "byte",
            IntType::Uint8 => "uint8",
            IntType::Int8 => "int8",
            IntType::Uint16 => "uint16",
            IntType::Int16 => "int16",
            IntType::Uint32 => "uint32",
            IntType::Int32 => "int32",
            IntType::Uint64 => "uint64",
            IntType::Int64 => "int64",
        }
    }

    /// Inclusive value bounds.
    pub fn bounds(&self) -> (i128, i128) {
        match self {
            IntType::Char | IntType::Uint8 => (0, u8::MAX as i128),
            IntType::Byte | IntType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            IntType::Uint16 => (0, u16::MAX as i128),
            IntType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            IntType::Uint32 => (0, u32::MAX as i128),
            IntType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            IntType::Uint64 => (0, u64::MAX as i128),
            IntType::Int64 => (i64::MIN as i128, i64::MAX as i128),
        }
    }
}

/// Floating-point field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FloatType {
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

impl FloatType {
    /// All float kinds, in declaration order.
    pub const ALL: [FloatType; 2] = [FloatType::Float32, FloatType::Float64];

    /// The declared name.
    pub fn name(&self) -> &'static str {
        match self {
            FloatType::Float32 => "float32",
            FloatType::Float64 => "float64",
        }
    }

    /// Finite value bounds.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            FloatType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            FloatType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Sampler width in bits.
    pub fn width(&self) -> u8 {
        match self {
            FloatType::Float32 => 32,
            FloatType::Float64 => 64,
        }
    }
}

/// Scalar kind of a field: a builtin kind or a composite message type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RosType {
    /// Boolean.
    Bool,
    /// Byte string of bounded length.
    String,
    /// Instant with unsigned 32-bit seconds and nanoseconds.
    Time,
    /// Signed 32-bit seconds and nanoseconds offset.
    Duration,
    /// Bounded integer.
    Int(IntType),
    /// Bounded float.
    Float(FloatType),
    /// Composite record type, named `pkg/Name`.
    Message(String),
}

impl RosType {
    /// Parses a declared type name. `Header` normalizes to `std_msgs/Header`;
    /// any name that is not a builtin scalar is a message type.
    pub fn parse(name: &str) -> RosType {
        match name {
            "bool" => RosType::Bool,
            "string" => RosType::String,
            "time" => RosType::Time,
            "duration" => RosType::Duration,
            "Header" => RosType::Message(HEADER_TYPE.to_owned()),
            other => {
                for int in IntType::ALL {
                    if int.name() == other {
                        return RosType::Int(int);
                    }
                }
                for float in FloatType::ALL {
                    if float.name() == other {
                        return RosType::Float(float);
                    }
                }
                RosType::Message(other.to_owned())
            }
        }
    }

    /// Returns `true` for integer and float kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(self, RosType::Int(_) | RosType::Float(_))
    }

    /// Returns `true` for composite message kinds.
    pub fn is_message(&self) -> bool {
        matches!(self, RosType::Message(_))
    }

    /// The declared name of this kind.
    pub fn name(&self) -> String {
        match self {
            RosType::Bool => "bool".to_owned(),
            RosType::String => "string".to_owned(),
            RosType::Time => "time".to_owned(),
            RosType::Duration => "duration".to_owned(),
            RosType::Int(t) => t.name().to_owned(),
            RosType::Float(t) => t.name().to_owned(),
            RosType::Message(t) => t.clone(),
        }
    }

    /// The name of the strategy procedure that samples this kind: builtin
    /// scalars map to `ros_<name>`, messages to `pkg_Name`.
    pub fn strategy_name(&self) -> String {
        match self {
            RosType::Message(t) => msg_strategy_name(t),
            other => format!("ros_{}", other.name()),
        }
    }
}

/// Strategy procedure name for a message type: `pkg/Name` becomes `pkg_Name`.
pub(crate) fn msg_strategy_name(msg_type: &str) -> String {
    if msg_type == "Header" {
        return "std_msgs_Header".to_owned();
    }
    msg_type.replace('/', "_")
}

/// Declared type of a field: a scalar kind plus an optional array marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeToken {
    /// The scalar kind of the field, or of the array's elements.
    pub ros_type: RosType,
    /// Arity of the field.
    pub arity: Arity,
}

/// Whether a field holds one value or an array of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arity {
    /// A single value.
    Scalar,
    /// An array with the given fixed length.
    FixedArray(usize),
    /// An array whose length is sampled up to the configured cap.
    VarArray,
}

impl TypeToken {
    /// A single-valued field of the named type.
    pub fn new(name: &str) -> Self {
        Self {
            ros_type: RosType::parse(name),
            arity: Arity::Scalar,
        }
    }

    /// A fixed-length array field.
    pub fn fixed_array(name: &str, length: usize) -> Self {
        Self {
            ros_type: RosType::parse(name),
            arity: Arity::FixedArray(length),
        }
    }

    /// A variable-length array field.
    pub fn var_array(name: &str) -> Self {
        Self {
            ros_type: RosType::parse(name),
            arity: Arity::VarArray,
        }
    }
}

/// Validated mapping from message type name to its field declarations.
///
/// Construction checks that every message type name has a `pkg/Name` shape and
/// that every composite-typed field references a type present in the table
/// (the builtin header record is always available). Type-level cycles are
/// legal; they are a property of the schema, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeTable {
    entries: BTreeMap<String, BTreeMap<String, TypeToken>>,
}

impl TypeTable {
    /// Builds a table from raw entries, validating name shapes and closure.
    pub fn new(entries: BTreeMap<String, BTreeMap<String, TypeToken>>) -> Result<Self, Error> {
        for (msg_type, fields) in &entries {
            if !msg_type.contains('/') {
                return Err(Error::MalformedTypeTable(format!(
                    "message type '{msg_type}' must be named 'pkg/Name'"
                )));
            }
            for (field, token) in fields {
                if let RosType::Message(dep) = &token.ros_type {
                    if dep != HEADER_TYPE && !entries.contains_key(dep) {
                        return Err(Error::MalformedTypeTable(format!(
                            "field '{field}' of '{msg_type}' references undefined type '{dep}'"
                        )));
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    /// Returns `true` if the message type is declared.
    pub fn contains(&self, msg_type: &str) -> bool {
        self.entries.contains_key(msg_type)
    }

    /// The field declarations of a message type.
    pub fn get(&self, msg_type: &str) -> Option<&BTreeMap<String, TypeToken>> {
        self.entries.get(msg_type)
    }

    /// Iterates over all message types in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, TypeToken>)> {
        self.entries.iter()
    }

    /// Number of declared message types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no message types are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up one field declaration, with dedicated errors for each miss.
    pub(crate) fn field(&self, msg_type: &str, field: &str) -> Result<&TypeToken, Error> {
        let fields = self
            .entries
            .get(msg_type)
            .ok_or_else(|| Error::UnknownType(msg_type.to_owned()))?;
        fields.get(field).ok_or_else(|| Error::UnknownField {
            msg_type: msg_type.to_owned(),
            field: field.to_owned(),
        })
    }
}
