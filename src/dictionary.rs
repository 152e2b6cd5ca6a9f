use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("Cannot read register dictionary: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed register dictionary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Register {name}: {field} {value} does not fit in one byte")]
    AddressOutOfRange {
        name: String,
        field: &'static str,
        value: u64,
    },

    #[error("Register {name}: unknown data type {tag:?}")]
    UnknownDataType { name: String, tag: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown register {name:?}")]
pub struct UnknownRegisterError {
    pub name: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    U16,
    I16,
    U32,
    I32,
}

impl DataType {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "U16" => Some(DataType::U16),
            "I16" => Some(DataType::I16),
            "U32" => Some(DataType::U32),
            "I32" => Some(DataType::I32),
            _ => None,
        }
    }

    /// Number of value bytes carried in a frame.
    pub fn width(&self) -> usize {
        match self {
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub index: u8,
    pub sub_index: u8,
    pub data_type: DataType,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct DictionaryFile {
    params: BTreeMap<String, RawDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    index: u64,
    #[serde(rename = "subIndex")]
    sub_index: u64,
    #[serde(rename = "type")]
    data_type: String,
    description: String,
}

impl RawDescriptor {
    fn validate(self, name: &str) -> Result<RegisterDescriptor, DictionaryError> {
        let index = address_byte(name, "index", self.index)?;
        let sub_index = address_byte(name, "subIndex", self.sub_index)?;
        let data_type = match DataType::from_tag(&self.data_type) {
            Some(data_type) => data_type,
            None => {
                return Err(DictionaryError::UnknownDataType {
                    name: name.to_string(),
                    tag: self.data_type,
                });
            }
        };
        Ok(RegisterDescriptor {
            index,
            sub_index,
            data_type,
            description: self.description,
        })
    }
}

fn address_byte(name: &str, field: &'static str, value: u64) -> Result<u8, DictionaryError> {
    u8::try_from(value).map_err(|_| DictionaryError::AddressOutOfRange {
        name: name.to_string(),
        field,
        value,
    })
}

/// Read-only mapping from command name to register descriptor.
///
/// Every entry is validated when the dictionary is built, so a successful
/// lookup always yields a complete descriptor.
#[derive(Clone, Debug, Default)]
pub struct RegisterDictionary {
    registers: BTreeMap<String, RegisterDescriptor>,
}

impl RegisterDictionary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dictionary = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} registers from {}",
            dictionary.len(),
            path.display()
        );
        Ok(dictionary)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, DictionaryError> {
        let file: DictionaryFile = serde_json::from_reader(reader)?;
        Self::from_file(file)
    }

    pub fn from_json_str(source: &str) -> Result<Self, DictionaryError> {
        let file: DictionaryFile = serde_json::from_str(source)?;
        Self::from_file(file)
    }

    fn from_file(file: DictionaryFile) -> Result<Self, DictionaryError> {
        let mut registers = BTreeMap::new();
        for (name, raw) in file.params {
            let descriptor = raw.validate(&name)?;
            registers.insert(name, descriptor);
        }
        Ok(RegisterDictionary { registers })
    }

    pub fn lookup(&self, name: &str) -> Result<&RegisterDescriptor, UnknownRegisterError> {
        self.registers.get(name).ok_or_else(|| UnknownRegisterError {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, RegisterDescriptor> {
        self.registers.iter()
    }
}

impl<'a> IntoIterator for &'a RegisterDictionary {
    type Item = (&'a String, &'a RegisterDescriptor);
    type IntoIter = btree_map::Iter<'a, String, RegisterDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
