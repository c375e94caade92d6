/// 将路径切分为各级名字，忽略空段：`"/a//b/"` 得到 `["a", "b"]`
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments() {
        assert_eq!(split_path("/home/user/docs"), ["home", "user", "docs"]);
        assert_eq!(split_path("/a//b/"), ["a", "b"]);
        assert!(split_path("/").is_empty());
        assert!(split_path("").is_empty());
    }
}
