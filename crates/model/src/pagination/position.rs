use std::fmt;

/// Opaque resume token handed to the host with every record and received back on open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position(Vec<u8>);

impl Position {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Position {
    fn from(bytes: Vec<u8>) -> Self {
        Position(bytes)
    }
}

impl From<&[u8]> for Position {
    fn from(bytes: &[u8]) -> Self {
        Position(bytes.to_vec())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
