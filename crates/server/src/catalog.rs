use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Category, Difficulty, Quiz, QuizSummary};

/// Archive filters; all given filters must match.
#[derive(Debug, Default, Deserialize)]
pub struct ArchiveFilter {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive match on title, question or concept.
    pub q: Option<String>,
}

impl ArchiveFilter {
    fn matches(&self, quiz: &Quiz) -> bool {
        if self.category.is_some_and(|c| c != quiz.category) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != quiz.difficulty) {
            return false;
        }
        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                quiz.title.to_lowercase().contains(&q)
                    || quiz.question.to_lowercase().contains(&q)
                    || quiz.concept().is_some_and(|c| c.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}

/// Published quizzes, one JSON file per slug, newest first.
#[derive(Debug, Default)]
pub struct QuizCatalog {
    quizzes: Vec<Quiz>,
}

impl QuizCatalog {
    pub fn new(mut quizzes: Vec<Quiz>) -> Self {
        quizzes.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.slug.cmp(&a.slug))
        });
        Self { quizzes }
    }

    /// A missing directory is an empty catalog. Unreadable files and quizzes
    /// that break the published invariants are skipped.
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "content directory missing, catalog is empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", dir.display())),
        };

        let mut quizzes = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(err) => warn!(path = %path.display(), "skipping quiz file: {err:#}"),
            }
        }
        debug!(count = quizzes.len(), dir = %dir.display(), "quiz catalog loaded");
        Ok(Self::new(quizzes))
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.slug == slug)
    }

    pub fn published_on(&self, date: NaiveDate) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.published_at == date)
    }

    pub fn archive(&self, filter: &ArchiveFilter) -> Vec<QuizSummary> {
        self.quizzes
            .iter()
            .filter(|q| filter.matches(q))
            .map(QuizSummary::from)
            .collect()
    }
}

fn read_quiz(path: &Path) -> Result<Quiz> {
    let raw = std::fs::read_to_string(path)?;
    let quiz: Quiz = serde_json::from_str(&raw)?;
    quiz.validate().map_err(anyhow::Error::msg)?;
    Ok(quiz)
}

pub fn quiz_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{slug}.json"))
}

/// Writes a new quiz file. Returns `false` without touching anything if the
/// slug is already published.
pub fn publish(dir: &Path, quiz: &Quiz) -> Result<bool> {
    if let Err(reason) = quiz.validate() {
        anyhow::bail!("refusing to publish {}: {reason}", quiz.slug);
    }
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = quiz_path(dir, &quiz.slug);
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("creating {}", path.display())),
    };
    let json = serde_json::to_string_pretty(quiz)?;
    file.write_all(json.as_bytes())?;
    Ok(true)
}
