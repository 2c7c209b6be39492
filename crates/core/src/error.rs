use crate::constants::RecordKind;

#[derive(Debug, thiserror::Error)]
pub enum LaudoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("CPF informado é inválido")]
    InvalidCpf,
    #[error("slot {index} does not exist (only {len} slots are open)")]
    SlotOutOfRange { index: usize, len: usize },
    #[error("{kind} record not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete record directory: {0}")]
    FileDelete(std::io::Error),

    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("translation error: {0}")]
    Translation(String),
    #[error("failed to read code list: {0}")]
    CodeList(String),

    #[error("invalid identifier: {0}")]
    Uuid(#[from] laudo_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] laudo_types::TextError),
}

pub type LaudoResult<T> = std::result::Result<T, LaudoError>;
