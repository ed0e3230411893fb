use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 一份待评分的提交
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// 提交标识
    pub id: String,
    /// 已存储的提交文件路径
    pub file_path: PathBuf,
}

impl Submission {
    pub fn new(id: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
        }
    }

    /// 以完整文件名作为提交标识，`scan.png` 与 `scan.jpg` 互不覆盖
    pub fn from_path(path: &Path) -> Self {
        let id = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(id, path)
    }
}

impl Display for Submission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[提交 {}]", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_keeps_extension() {
        let png = Submission::from_path(Path::new("submissions/trainee.png"));
        let jpg = Submission::from_path(Path::new("submissions/trainee.jpg"));
        assert_eq!(png.id, "trainee.png");
        assert_eq!(jpg.id, "trainee.jpg");
        assert_ne!(png.id, jpg.id);
        assert_eq!(png.to_string(), "[提交 trainee.png]");
    }
}
