//! 控制台交互：收集学生档案、读取参考文档目录

use std::io::{self, BufRead, Write};
use std::path::Path;

use walkdir::WalkDir;

use crate::core::TutorError;
use crate::profile::StudentProfile;

pub const WELCOME: &str = "Welcome to the Personalized Teaching Agent!";

const PROMPTS: [&str; 5] = [
    "Enter student name: ",
    "Enter the topic to learn: ",
    "Describe your learning style (visual/auditory/reading/writing): ",
    "Describe your prior knowledge on the topic: ",
    "What are your learning goals? ",
];

/// 依次提示五个字段并读取一行；输入提前结束时返回 UnexpectedEof
pub fn prompt_student_profile<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<StudentProfile> {
    writeln!(output, "{}", WELCOME)?;

    let mut answers = Vec::with_capacity(PROMPTS.len());
    for prompt in PROMPTS {
        write!(output, "{}", prompt)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input ended before answering {:?}", prompt.trim_end()),
            ));
        }
        answers.push(line.trim_end_matches(['\r', '\n']).to_string());
    }

    let mut answers = answers.into_iter();
    let mut next = || answers.next().unwrap_or_default();
    Ok(StudentProfile {
        name: next(),
        topic: next(),
        learning_style: next(),
        prior_knowledge: next(),
        goals: next(),
        documents: Vec::new(),
    })
}

/// 递归读取目录下的 .txt / .md 文件，按路径排序后作为参考文档
pub fn load_documents(dir: &Path) -> Result<Vec<String>, TutorError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| TutorError::Io(e.into()))?;
        let is_text = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "md"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_text {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(std::fs::read_to_string(&path)?);
    }
    tracing::info!("Loaded {} reference documents from {}", documents.len(), dir.display());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_collects_five_fields_in_order() {
        let mut input = Cursor::new("Ada\nPhotosynthesis\nvisual\r\nbasic biology\nace the test\n");
        let mut output = Vec::new();
        let profile = prompt_student_profile(&mut input, &mut output).unwrap();

        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.topic, "Photosynthesis");
        assert_eq!(profile.learning_style, "visual");
        assert_eq!(profile.prior_knowledge, "basic biology");
        assert_eq!(profile.goals, "ace the test");
        assert!(profile.documents.is_empty());

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with(WELCOME));
        assert!(printed.contains("What are your learning goals? "));
    }

    #[test]
    fn test_prompt_eof_is_error() {
        let mut input = Cursor::new("Ada\nOptics\n");
        let err = prompt_student_profile(&mut input, &mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_load_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.md"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();
        std::fs::write(dir.path().join("nested/c.TXT"), "third").unwrap();
        std::fs::write(dir.path().join("image.png"), "binary").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs, vec!["first", "second", "third"]);
    }
}
