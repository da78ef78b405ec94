use std::io::{self, Write};
use std::path::PathBuf;

use colored::*;

use brainsnack_client::api::ApiClient;
use brainsnack_client::models::{
    ANSWER_LETTERS, AnswerResult, ArchiveFilter, CATEGORIES, QuizState, QuizSummary, stars,
};
use brainsnack_client::session::{QuizSession, stored_result};
use brainsnack_client::storage::{FileStore, KeyValueStore};

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_URL: &str = "https://brain-snack.vercel.app";
const ANON_ID_KEY: &str = "anon_id";

// ===== Main =====

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let backend_url =
        dotenv::var("BRAINSNACK_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
    let site_url = dotenv::var("BRAINSNACK_SITE").unwrap_or_else(|_| DEFAULT_SITE_URL.to_string());
    let state_path = dotenv::var("BRAINSNACK_STATE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_state_path());

    println!("{}", "=".repeat(60).bright_cyan());
    println!("{}", "    🧠 뇌간식 · 매일 한 입 크기 지식 퀴즈".bright_yellow().bold());
    println!("{}", "=".repeat(60).bright_cyan());
    println!();

    let mut storage = FileStore::open(&state_path)?;
    let api = ApiClient::new(&backend_url, storage.get(ANON_ID_KEY))?;

    archive_loop(&api, &mut storage, &site_url).await
}

fn default_state_path() -> PathBuf {
    dotenv::var("HOME")
        .map(|home| PathBuf::from(home).join(".brainsnack.json"))
        .unwrap_or_else(|_| PathBuf::from("brainsnack_state.json"))
}

fn prompt() -> io::Result<String> {
    print!("{}", "> ".bright_green().bold());
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_lowercase())
}

// ===== Archive =====

async fn archive_loop(api: &ApiClient, storage: &mut FileStore, site_url: &str) -> anyhow::Result<()> {
    let mut filter = ArchiveFilter::default();
    loop {
        println!("Fetching archive...");
        let quizzes = match api.archive(&filter).await {
            Ok(quizzes) => quizzes,
            Err(e) => {
                eprintln!("{} {}", "❌ Could not load quizzes:".red().bold(), e);
                return Ok(());
            }
        };

        if quizzes.is_empty() && filter.is_empty() {
            println!("{}", "No quizzes published yet. Come back tomorrow!".yellow());
            return Ok(());
        }

        if !filter.is_empty() {
            println!("{} {}", "Filter:".bright_black(), filter.describe().magenta());
        }
        if quizzes.is_empty() {
            println!("{}", "No quizzes match this filter.".yellow());
        } else {
            print_archive(&quizzes, storage);
        }
        println!(
            "{}",
            "Pick a quiz: [number]  [F]ilter  [C]lear filter  [Q]uit".bright_black()
        );

        let input = prompt()?;
        match input.as_str() {
            "q" | "quit" => {
                println!();
                println!("{}", "내일 또 만나요! 👋".bright_cyan().bold());
                return Ok(());
            }
            "f" | "filter" => filter = ask_filter()?,
            "c" | "clear" => filter = ArchiveFilter::default(),
            _ => {
                let Some(summary) = input
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| quizzes.get(i))
                else {
                    println!("{}", "Invalid choice. Please try again.".red());
                    continue;
                };
                play(api, storage, &summary.slug, site_url).await?;
            }
        }
    }
}

fn ask_filter() -> io::Result<ArchiveFilter> {
    println!();
    for (i, category) in CATEGORIES.iter().enumerate() {
        println!("{:>4}. {}", (i + 1).to_string().bright_cyan(), category);
    }
    println!("{}", "Category number (blank for all):".bright_black());
    let category = prompt()?;
    println!("{}", "Difficulty 1-3 (blank for all):".bright_black());
    let difficulty = prompt()?;
    println!("{}", "Search title, question or concept (blank for none):".bright_black());
    let search = prompt()?;
    Ok(ArchiveFilter::from_answers(&category, &difficulty, &search))
}

fn print_archive(quizzes: &[QuizSummary], storage: &FileStore) {
    println!("{}", "━".repeat(60).bright_black());
    for (i, quiz) in quizzes.iter().enumerate() {
        let mark = match stored_result(storage, &quiz.slug).map(|r| r.result) {
            Some(AnswerResult::Correct) => "✅".to_string(),
            Some(AnswerResult::Wrong) => "❌".to_string(),
            None => "· ".bright_black().to_string(),
        };
        println!(
            "{:>3}. {} {} {} {}",
            (i + 1).to_string().bright_cyan(),
            mark,
            quiz.published_at.to_string().bright_black(),
            format!("[{}]", quiz.category).magenta(),
            quiz.title.bright_white().bold()
        );
        if let Some(hook) = &quiz.hook {
            println!("       {}", hook.bright_black());
        }
    }
    println!();
}

// ===== Quiz =====

async fn play(api: &ApiClient, storage: &mut FileStore, slug: &str, site_url: &str) -> anyhow::Result<()> {
    let quiz = match api.quiz(slug).await {
        Ok(quiz) => quiz,
        Err(e) => {
            eprintln!("{} {}", "❌ Could not load quiz:".red().bold(), e);
            return Ok(());
        }
    };

    let mut session = QuizSession::restore(quiz, storage);

    if session.is_finished() {
        println!("{}", "You already answered this one on this device.".yellow());
        print!("{}", reveal(&session, site_url));
        session.refresh_stats(api).await;
        print_stats(&session);
        return Ok(());
    }

    loop {
        print_question(&session);
        println!(
            "{}",
            "Choose: [A-D]  Submit: [S]  Back: [B]".bright_black()
        );

        let input = prompt()?;
        match input.as_str() {
            "b" | "back" => return Ok(()),
            "s" | "submit" => {
                if session.submit().is_none() {
                    println!("{}", "Pick a choice first.".red());
                    continue;
                }
                break;
            }
            other => {
                let index = other
                    .chars()
                    .next()
                    .map(|c| c.to_ascii_uppercase())
                    .and_then(|c| ANSWER_LETTERS.iter().position(|&l| l == c));
                match index {
                    Some(i) if session.select_choice(i) => {}
                    _ => println!("{}", "Invalid choice. Please try again.".red()),
                }
            }
        }
    }

    print!("{}", reveal(&session, site_url));
    session.sync_stats(api).await;
    print_stats(&session);
    drop(session);

    if let Some(id) = api.anon_id() {
        if storage.get(ANON_ID_KEY).as_deref() != Some(id.as_str()) {
            storage.set(ANON_ID_KEY, id)?;
        }
    }
    Ok(())
}

fn print_question<S: KeyValueStore>(session: &QuizSession<'_, S>) {
    let quiz = session.quiz();
    println!("{}", "━".repeat(60).bright_black());
    println!();
    println!(
        "{} {} {}",
        format!("[{}]", quiz.category).magenta().bold(),
        stars(quiz.difficulty).yellow(),
        quiz.published_at.to_string().bright_black()
    );
    println!();
    println!("{}", quiz.question.bright_white().bold());
    println!();
    for (i, choice) in quiz.choices.iter().enumerate() {
        if session.selected() == Some(i) {
            println!("  {} {}", "▶".bright_green(), choice.bright_green().bold());
        } else {
            println!("    {}", choice);
        }
    }
    println!();
}

/// Result, answer key, explanation and share text. Needs nothing from the
/// network, so it is shown as soon as the answer is scored.
fn reveal<S: KeyValueStore>(session: &QuizSession<'_, S>, site_url: &str) -> String {
    let quiz = session.quiz();
    let mut out = String::from("\n");
    match session.state() {
        QuizState::Correct => out.push_str(&format!("{}\n", "🎉 정답입니다!".green().bold())),
        QuizState::Wrong => {
            let letter = quiz.answer_letter().map(String::from).unwrap_or_default();
            out.push_str(&format!(
                "{} {}\n",
                "😅 아쉬워요! 정답은".red().bold(),
                letter.green().bold()
            ));
        }
        QuizState::Unsolved | QuizState::Solving => return String::new(),
    }
    out.push('\n');

    for (i, choice) in quiz.choices.iter().enumerate() {
        let line = if i == quiz.correct_index {
            format!("  {} {}", "✓".green().bold(), choice.green())
        } else if session.selected() == Some(i) {
            format!("  {} {}", "✗".red().bold(), choice.red())
        } else {
            format!("    {}", choice.bright_black())
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&format!("\n{}\n", "해설".bright_yellow().bold()));
    out.push_str(&format!("{}\n", quiz.explanation));
    out.push_str(&format!("\n{}\n", "공유하기".bright_yellow().bold()));
    out.push_str(&format!("{}\n\n", session.share_text(site_url).bright_blue()));
    out
}

/// Choice distribution, printed once stats arrive. Prints nothing when they
/// could not be fetched.
fn print_stats<S: KeyValueStore>(session: &QuizSession<'_, S>) {
    let Some(stats) = session.stats() else {
        return;
    };
    println!("{}", "다른 사람들의 선택".bright_yellow().bold());
    for (i, letter) in ANSWER_LETTERS.iter().enumerate() {
        let percent = session
            .percent(i)
            .map(|p| format!("{p:>3}%"))
            .unwrap_or_else(|| "  -".to_string());
        let line = format!("  {letter}  {percent}");
        if i == session.quiz().correct_index {
            println!("{}", line.green());
        } else {
            println!("{}", line.bright_black());
        }
    }
    if let Some(rate) = session.correct_rate() {
        println!(
            "{}",
            format!("{}명 중 {}%가 맞혔어요", stats.total, rate).bright_black()
        );
    }
    println!();
}
