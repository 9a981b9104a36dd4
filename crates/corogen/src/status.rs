//! Classification of status literals by their leading byte.
//!
//! `?` marks an error, `$` a suspension; anything else (including the empty
//! message) is a warning, which control flow treats like success.

pub fn status_msg_is_error(msg: &str) -> bool {
    msg.starts_with('?')
}

pub fn status_msg_is_suspension(msg: &str) -> bool {
    msg.starts_with('$')
}

pub fn status_msg_is_warning(msg: &str) -> bool {
    !status_msg_is_error(msg) && !status_msg_is_suspension(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_prefix() {
        assert!(status_msg_is_error("?bad header"));
        assert!(!status_msg_is_warning("?bad header"));
        assert!(status_msg_is_suspension("$short read"));
        assert!(!status_msg_is_warning("$short read"));
        assert!(status_msg_is_warning("@end of data"));
        assert!(status_msg_is_warning(""));
    }
}
