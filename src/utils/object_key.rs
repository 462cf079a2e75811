/// Builds the object key `folder/file_name`, or just `file_name` when no
/// folder was given.
pub fn compose_object_key(folder: Option<&str>, file_name: &str) -> String {
    match folder {
        Some(folder) if !folder.is_empty() => format!("{}/{}", folder, file_name),
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_object_key() {
        assert_eq!(compose_object_key(Some("avatars"), "me.png"), "avatars/me.png");
        assert_eq!(compose_object_key(Some("a/b"), "me.png"), "a/b/me.png");
        assert_eq!(compose_object_key(Some(""), "me.png"), "me.png");
        assert_eq!(compose_object_key(None, "me.png"), "me.png");
    }
}
