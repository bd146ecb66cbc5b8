//! Message commands: append, recent, clear.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use chatlog_types::message::{Message, MessageRole};

use crate::state::AppState;

/// Append one or more messages with the same role.
///
/// Several texts go in as one batch so they share a timestamp and keep
/// their order.
pub async fn append(
    state: &AppState,
    conversation: &str,
    role: MessageRole,
    texts: Vec<String>,
    json: bool,
) -> Result<()> {
    let messages: Vec<Message> = texts.into_iter().map(|t| Message::new(role, t)).collect();

    match messages.as_slice() {
        [single] => state.store.append(conversation, single).await?,
        batch => state.store.append_all(conversation, batch).await?,
    }

    if json {
        let result = serde_json::json!({
            "conversation": conversation,
            "appended": messages.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Appended {} {} message(s) to '{}'",
            style("ok").green(),
            messages.len(),
            style(role).cyan(),
            style(conversation).cyan(),
        );
        println!();
    }

    Ok(())
}

/// Print the most recent messages, oldest first.
pub async fn recent(state: &AppState, conversation: &str, limit: i64, json: bool) -> Result<()> {
    let messages = state.store.recent_messages(conversation, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} No messages in '{}'",
            style("i").blue().bold(),
            style(conversation).cyan(),
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Text").fg(Color::White),
    ]);

    for (i, message) in messages.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(message.role).fg(role_color(message.role)),
            Cell::new(&message.text),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Delete all messages of a conversation.
pub async fn clear(state: &AppState, conversation: &str, json: bool) -> Result<()> {
    state.store.clear(conversation).await?;

    if json {
        let result = serde_json::json!({ "cleared": conversation });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Cleared '{}'",
            style("ok").green(),
            style(conversation).cyan(),
        );
        println!();
    }

    Ok(())
}

fn role_color(role: MessageRole) -> Color {
    match role {
        MessageRole::User => Color::Cyan,
        MessageRole::Assistant => Color::Green,
        MessageRole::System => Color::Yellow,
    }
}
