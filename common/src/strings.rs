use std::ffi::{c_char, CStr};
use std::str::Utf8Error;

/// A borrowed, possibly-null C string pointer.
///
/// Several native callback signatures (the SRT log handler among them) hand
/// back a raw `*const c_char` that may legitimately be null. `PSTR` defers the
/// unsafe dereference to `to_string`, so call sites stay branch-free until
/// they actually need the text.
#[derive(Debug, Clone, Copy)]
pub struct PSTR(*const c_char);

impl From<*const c_char> for PSTR {
    fn from(ptr: *const c_char) -> Self {
        Self(ptr)
    }
}

impl PSTR {
    pub fn to_string(self) -> Result<String, Utf8Error> {
        if self.0.is_null() {
            return Ok(String::new());
        }

        unsafe { CStr::from_ptr(self.0) }.to_str().map(str::to_string)
    }
}
