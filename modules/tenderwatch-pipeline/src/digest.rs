// Digest composition. Pure: same task, items and timestamp always produce
// byte-identical HTML and text bodies, in the order the scorer ranked them.

use chrono::{DateTime, Utc};

use tenderwatch_common::{DigestMessage, ScoredTender, SubscriberTask};

pub fn compose(
    task: &SubscriberTask,
    items: Vec<ScoredTender>,
    now: DateTime<Utc>,
    unsubscribe_base: &str,
) -> DigestMessage {
    let date = now.format("%d.%m.%Y").to_string();
    let unsubscribe_ref = unsubscribe_url(unsubscribe_base, &task.subscriber_id);

    DigestMessage {
        recipient_email: task.email.clone(),
        subject: subject_for(items.len()),
        html_body: html_body(&items, &date, &unsubscribe_ref),
        text_body: text_body(&items, &date, &unsubscribe_ref),
        unsubscribe_ref,
        items,
    }
}

fn subject_for(count: usize) -> String {
    if count > 0 {
        format!("🎯 Nalezeno {count} relevantních zakázek")
    } else {
        "📋 Denní přehled veřejných zakázek".to_string()
    }
}

fn unsubscribe_url(base: &str, subscriber_id: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    let uid: String = url::form_urlencoded::byte_serialize(subscriber_id.as_bytes()).collect();
    format!("{base}{sep}uid={uid}")
}

/// Czech plural of "zakázka" with the "nová" qualifier, for the stats box.
fn stats_label(count: usize) -> &'static str {
    match count {
        1 => "nová zakázka",
        2..=4 => "nové zakázky",
        _ => "nových zakázek",
    }
}

/// Bare plural for the text rendering's NALEZENO line.
fn found_label(count: usize) -> &'static str {
    match count {
        1 => "zakázka",
        2..=4 => "zakázky",
        _ => "zakázek",
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const NO_RESULTS_HTML: &str = r#"<div class="no-results">
<p><strong>Dnes jsme nenašli žádné nové zakázky odpovídající vašim kritériím.</strong></p>
<div class="suggestions">
<p>💡 <strong>Doporučení pro lepší výsledky:</strong></p>
<ul>
<li>Zkontrolujte a rozšiřte klíčová slova</li>
<li>Upravte popis firmy pro širší pokrytí</li>
<li>Zkuste vyhledávání za několik dní</li>
</ul>
</div>
</div>"#;

fn html_body(items: &[ScoredTender], date: &str, unsubscribe_ref: &str) -> String {
    let results = if items.is_empty() {
        NO_RESULTS_HTML.to_string()
    } else {
        let cards: String = items
            .iter()
            .map(|item| {
                let deadline = item
                    .notice
                    .deadline
                    .map(|d| {
                        format!(
                            "<p class=\"tender-deadline\">Lhůta pro podání nabídek: {}</p>\n",
                            d.format("%d.%m.%Y")
                        )
                    })
                    .unwrap_or_default();
                format!(
                    "<div class=\"tender-item\">\n\
                     <h4 class=\"tender-title\">{}</h4>\n\
                     <p class=\"tender-description\">{}</p>\n\
                     {}\
                     <a href=\"{}\" class=\"tender-link\">📋 Více informací zde</a>\n\
                     </div>",
                    escape(&item.notice.title),
                    escape(&item.rationale),
                    deadline,
                    escape(&item.notice.source_url),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "<div class=\"results-found\">\n\
             <p><strong>Nalezli jsme následující relevantní zakázky:</strong></p>\n\
             <div class=\"tender-list\">\n{cards}\n</div>\n</div>"
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="cs">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Výsledky vyhledávání zakázek</title>
<style>
body {{ margin: 0; background-color: #f8fafc; font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.6; color: #374151; }}
.email-container {{ max-width: 600px; margin: 0 auto; background-color: #ffffff; }}
.header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 40px 30px; text-align: center; }}
.header h1 {{ color: #ffffff; font-size: 24px; margin: 0; }}
.header .date {{ color: #e2e8f0; font-size: 14px; margin-top: 8px; }}
.content {{ padding: 40px 30px; }}
.stats {{ background: #e0f2fe; border-radius: 8px; padding: 20px; margin: 20px 0; text-align: center; }}
.stats-number {{ font-size: 32px; font-weight: 700; color: #0369a1; }}
.stats-label {{ font-size: 14px; color: #0f172a; }}
.tender-item {{ background-color: #ffffff; border-radius: 8px; padding: 20px; margin: 15px 0; border-left: 3px solid #667eea; box-shadow: 0 2px 4px rgba(0,0,0,0.05); }}
.tender-title {{ font-size: 16px; font-weight: 600; color: #1f2937; margin: 0 0 10px 0; }}
.tender-description {{ font-size: 14px; color: #6b7280; margin: 0 0 10px 0; }}
.tender-deadline {{ font-size: 13px; color: #92400e; margin: 0 0 10px 0; }}
.tender-link {{ color: #667eea; text-decoration: none; font-weight: 500; }}
.footer {{ background-color: #f9fafb; padding: 30px; text-align: center; border-top: 1px solid #e5e7eb; font-size: 13px; color: #6b7280; }}
.footer a {{ color: #667eea; }}
</style>
</head>
<body>
<div class="email-container">
<div class="header">
<h1>Přehled nových zakázek</h1>
<div class="date">{date}</div>
</div>
<div class="content">
<div class="greeting"><strong>Dobrý den,</strong><br>
připravili jsme pro vás přehled nových veřejných zakázek na základě vašich preferencí.</div>
<div class="stats">
<div class="stats-number">{count}</div>
<div class="stats-label">{label}</div>
</div>
{results}
</div>
<div class="footer">
<p><strong>Vyhledávač zakázek</strong> - váš spolehlivý partner pro veřejné zakázky</p>
<p>Tento email je generován automaticky na základě vašich nastavení.</p>
<p><a href="{unsubscribe}">Odhlásit se</a></p>
</div>
</div>
</body>
</html>"#,
        date = date,
        count = items.len(),
        label = stats_label(items.len()),
        results = results,
        unsubscribe = escape(unsubscribe_ref),
    )
}

fn text_body(items: &[ScoredTender], date: &str, unsubscribe_ref: &str) -> String {
    let results = if items.is_empty() {
        "Dnes jsme nenašli žádné nové zakázky odpovídající vašim kritériím.\n\
         Tip: Zkuste rozšířit klíčová slova nebo upravit popis firmy."
            .to_string()
    } else {
        items
            .iter()
            .map(|item| {
                let mut block = format!("• {}\n  {}", item.notice.title, item.rationale);
                if let Some(d) = item.notice.deadline {
                    block.push_str(&format!("\n  Lhůta: {}", d.format("%d.%m.%Y")));
                }
                block.push_str(&format!("\n  {}", item.notice.source_url));
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "VYHLEDÁVAČ ZAKÁZEK - PŘEHLED {date}\n\n\
         Dobrý den,\n\n\
         připravili jsme pro vás přehled nových veřejných zakázek.\n\n\
         VÝSLEDKY:\n{results}\n\n\
         NALEZENO: {count} {label}\n\n\
         ODHLÁSIT SE:\n{unsubscribe}\n\n\
         ---\n\
         Tento email je generován automaticky. Prosím neodpovídejte na tuto zprávu.\n",
        date = date,
        results = results,
        count = items.len(),
        label = found_label(items.len()),
        unsubscribe = unsubscribe_ref,
    )
}
