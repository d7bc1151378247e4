use std::fmt;

use crate::types::{
    page::{row, COLUMN_EMAIL_MAX, COLUMN_USERNAME_MAX},
    PageboyError, Result,
};

/// Serialized row width in bytes.
pub const ROW_SIZE: usize = row::ROW_SIZE;

/// A fixed-schema table row.
///
/// The string columns are bounded: usernames hold at most
/// [`COLUMN_USERNAME_MAX`] bytes and emails at most [`COLUMN_EMAIL_MAX`] bytes.
/// Neither may contain a NUL byte, since NUL terminates the on-page field.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Row {
    id: u32,
    username: String,
    email: String,
}

impl Row {
    /// Builds a row, rejecting values that would not fit the fixed layout.
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let email = email.into();
        if username.len() > COLUMN_USERNAME_MAX {
            return Err(PageboyError::Invalid("username exceeds 32 bytes"));
        }
        if email.len() > COLUMN_EMAIL_MAX {
            return Err(PageboyError::Invalid("email exceeds 255 bytes"));
        }
        if username.contains('\0') || email.contains('\0') {
            return Err(PageboyError::Invalid("row strings may not contain NUL"));
        }
        Ok(Self {
            id,
            username,
            email,
        })
    }

    /// Primary key.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Username column.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Email column.
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

/// Copies `src` into the first [`ROW_SIZE`] bytes of `dst`.
///
/// The layout is id, then username, then email, with no padding and no
/// length prefix; unused string bytes are zeroed.
pub fn serialize_row(src: &Row, dst: &mut [u8]) -> Result<()> {
    if dst.len() < ROW_SIZE {
        return Err(PageboyError::Invalid("row destination shorter than ROW_SIZE"));
    }
    let dst = &mut dst[..ROW_SIZE];
    dst[row::ID].copy_from_slice(&src.id.to_le_bytes());
    write_str(&mut dst[row::USERNAME], &src.username);
    write_str(&mut dst[row::EMAIL], &src.email);
    Ok(())
}

/// Decodes a row from the first [`ROW_SIZE`] bytes of `src`.
pub fn deserialize_row(src: &[u8]) -> Result<Row> {
    if src.len() < ROW_SIZE {
        return Err(PageboyError::Corruption("row source shorter than ROW_SIZE"));
    }
    let mut id = [0u8; 4];
    id.copy_from_slice(&src[row::ID]);
    Ok(Row {
        id: u32::from_le_bytes(id),
        username: read_str(&src[row::USERNAME])?,
        email: read_str(&src[row::EMAIL])?,
    })
}

fn write_str(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    field[..bytes.len()].copy_from_slice(bytes);
    field[bytes.len()..].fill(0);
}

fn read_str(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(str::to_owned)
        .map_err(|_| PageboyError::Corruption("row string is not valid UTF-8"))
}
