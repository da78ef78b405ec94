//! Email bodies and the one HTML page the API renders itself.

use crate::models::Quiz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub html: String,
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn frame(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head><meta charset="UTF-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="margin:0;padding:0;background:#F8F9FA;font-family:'Pretendard',-apple-system,sans-serif;">
  <div style="max-width:600px;margin:0 auto;background:white;padding:32px;">
{body}
    <p style="font-size:13px;color:#636E72;margin-top:32px;border-top:1px solid #eee;padding-top:16px;">뇌간식 · 매일 한 입 크기 지식 퀴즈</p>
  </div>
</body>
</html>"#
    )
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{href}" style="display:inline-block;padding:14px 28px;background:#6C5CE7;color:white;text-decoration:none;border-radius:12px;font-weight:bold;font-size:16px;margin:16px 0;">{label}</a>"#
    )
}

pub fn confirm_url(site_url: &str, token: &str) -> String {
    format!("{site_url}/api/confirm?token={token}")
}

pub fn unsubscribe_url(site_url: &str, token: &str) -> String {
    format!("{site_url}/api/unsubscribe?token={token}")
}

pub fn confirmation_email(site_url: &str, token: &str) -> EmailTemplate {
    let body = format!(
        r#"    <h1 style="font-size:24px;color:#6C5CE7;">🧠 뇌간식</h1>
    <p style="font-size:16px;line-height:1.6;">구독 신청해주셔서 감사합니다!</p>
    <p style="font-size:16px;line-height:1.6;">아래 버튼을 누르면 구독이 완료됩니다.</p>
    {}
    <p style="font-size:13px;color:#636E72;">본인이 요청하지 않았다면 이 메일은 무시해주세요.</p>"#,
        button(&confirm_url(site_url, token), "구독 확인하기")
    );
    EmailTemplate {
        subject: "[뇌간식] 구독을 확인해주세요!".to_string(),
        html: frame(&body),
    }
}

pub fn welcome_email(site_url: &str) -> EmailTemplate {
    let body = format!(
        r#"    <h1 style="color:#6C5CE7;font-size:28px;">🧠 환영합니다!</h1>
    <p style="font-size:16px;line-height:1.6;color:#2D3436;">
      <strong>뇌간식</strong>에 오신 걸 환영해요!<br><br>
      내일 아침 8시, 첫 번째 문제가 도착합니다.<br>
      그동안 아카이브에서 미리 문제를 풀어보세요.
    </p>
    {}"#,
        button(&format!("{site_url}/archive"), "아카이브 둘러보기 →")
    );
    EmailTemplate {
        subject: "[뇌간식] 구독이 완료되었어요 🧠".to_string(),
        html: frame(&body),
    }
}

/// Follow-up mail for a given number of days after confirmation.
pub fn welcome_sequence(day: u32, site_url: &str) -> Option<EmailTemplate> {
    let (subject, heading, text, href, label) = match day {
        1 => (
            "[뇌간식] 첫 문제, 어땠어요?",
            "첫 문제 풀어봤어요?",
            "매일 아침 한 문제씩, 딱 1분이면 충분해요. 어제 문제를 놓쳤다면 아카이브에서 바로 풀 수 있어요.",
            format!("{site_url}/archive"),
            "지난 문제 풀기 →",
        ),
        3 => (
            "[뇌간식] 좋아하는 분야만 골라 풀 수도 있어요",
            "취향대로 골라 먹는 지식",
            "경제부터 한국사, 과학, 예술까지 열 가지 카테고리가 있어요. 아카이브에서 관심 있는 분야만 모아 풀어보세요.",
            format!("{site_url}/archive"),
            "카테고리 둘러보기 →",
        ),
        7 => (
            "[뇌간식] 일주일 동안 함께해줘서 고마워요",
            "벌써 일주일!",
            "매일 한 입씩 쌓인 지식이 꽤 돼요. 재밌었던 문제가 있다면 친구에게도 공유해보세요.",
            site_url.to_string(),
            "오늘의 문제 보기 →",
        ),
        _ => return None,
    };

    let body = format!(
        r#"    <h1 style="color:#6C5CE7;font-size:24px;">🧠 {heading}</h1>
    <p style="font-size:16px;line-height:1.6;color:#2D3436;">{text}</p>
    {}"#,
        button(&href, label)
    );
    Some(EmailTemplate {
        subject: subject.to_string(),
        html: frame(&body),
    })
}

/// The daily quiz mail. Each choice links straight into the quiz page.
pub fn daily_newsletter(quiz: &Quiz, site_url: &str, unsubscribe_token: &str) -> EmailTemplate {
    let quiz_url = format!("{site_url}/quiz/{}", quiz.slug);
    let choices = quiz
        .choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            format!(
                r#"      <a href="{quiz_url}?choice={i}" style="display:block;padding:14px 16px;margin-bottom:8px;border:2px solid #E2E8F0;border-radius:12px;text-decoration:none;color:#2D3436;">{}</a>"#,
                escape(choice)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let body = format!(
        r#"    <table width="100%"><tr>
      <td><span style="font-size:24px">🧠</span> <strong style="color:#6C5CE7;font-size:18px;">뇌간식</strong></td>
      <td align="right" style="color:#636E72;font-size:13px;">{date}</td>
    </tr></table>
    <div style="margin:16px 0;">
      <span style="display:inline-block;padding:4px 10px;border-radius:99px;color:white;font-size:12px;font-weight:bold;background:{color};">{category}</span>
      <span style="color:#636E72;font-size:13px;margin-left:8px;">{stars}</span>
    </div>
    <div style="font-size:18px;font-weight:bold;line-height:1.6;color:#2D3436;margin-bottom:24px;">{question}</div>
{choices}
    <div style="text-align:center;margin-top:24px;">{cta}</div>
    <p style="font-size:12px;color:#636E72;text-align:center;">
      <a href="{unsubscribe}" style="color:#636E72;">구독 해지</a> ·
      <a href="{site_url}/archive" style="color:#636E72;">아카이브</a>
    </p>"#,
        date = quiz.published_at,
        color = quiz.category.color(),
        category = quiz.category,
        stars = format!("{} {}", quiz.difficulty.stars(), quiz.difficulty.label()),
        question = escape(&quiz.question),
        cta = button(&quiz_url, "정답 확인하기 →"),
        unsubscribe = unsubscribe_url(site_url, unsubscribe_token),
    );

    EmailTemplate {
        subject: format!("[뇌간식] {}", quiz.title),
        html: frame(&body),
    }
}

/// Result page for the unsubscribe link.
pub fn unsubscribe_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head><meta charset="UTF-8"><meta name="viewport" content="width=device-width,initial-scale=1.0"><title>뇌간식 구독 해지</title></head>
<body style="margin:0;padding:0;background:#F8F9FA;font-family:'Pretendard',-apple-system,sans-serif;display:flex;align-items:center;justify-content:center;min-height:100vh;">
  <div style="max-width:400px;text-align:center;padding:32px;">
    <p style="font-size:48px;margin-bottom:16px;">🧠</p>
    <h1 style="font-size:20px;color:#2D3436;margin-bottom:8px;">{}</h1>
    <p style="font-size:14px;color:#636E72;margin-bottom:24px;">뇌간식을 이용해주셔서 감사합니다.</p>
    <a href="/" style="display:inline-block;padding:12px 24px;background:#6C5CE7;color:white;text-decoration:none;border-radius:12px;font-weight:bold;">홈으로 돌아가기</a>
  </div>
</body>
</html>"#,
        escape(message)
    )
}
