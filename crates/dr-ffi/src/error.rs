use std::cell::RefCell;
use std::ffi::CString;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `dr_last_error`.
///
/// Interior NUL bytes are stripped so the message is never lost.
pub fn set_last_error(msg: impl Into<String>) {
    let mut msg: String = msg.into();
    msg.retain(|c| c != '\0');
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}
