use std::fmt::Write;

use civic_types::PollVote;

use super::formatting::{format_timestamp, wrap_content, CONTENT_WIDTH};
use crate::app::{
    ComposerView, DropdownContent, ItemState, Notice, PollBody, PollsView, PostListView, ProfileView, SearchView,
};

fn push_notice(out: &mut String, notice: Option<&Notice>) {
    if let Some(notice) = notice {
        let tag = match notice {
            Notice::Validation(_) | Notice::Error(_) => "!",
            Notice::Success(_) => "✓",
            Notice::Info(_) => "i",
        };
        let _ = writeln!(out, "[{}] {}", tag, notice.message());
    }
}

pub fn render_post_list(view: &PostListView, notice: Option<&Notice>) -> String {
    let mut out = String::new();
    push_notice(&mut out, notice);

    match view {
        PostListView::Loading => out.push_str("Loading posts...\n"),
        PostListView::Error(err) => {
            let _ = writeln!(out, "Error loading posts: {}", err);
        }
        PostListView::Empty(msg) => {
            let _ = writeln!(out, "{}", msg);
        }
        PostListView::Rows(rows) => {
            for row in rows {
                let edited = if row.edited { " (edited)" } else { "" };
                let _ = writeln!(out, "{} · {}{}", row.post.display_name, row.timestamp, edited);

                let body = match &row.state {
                    ItemState::Editing { draft } | ItemState::Saving { draft } => draft.as_str(),
                    _ => row.post.content.as_str(),
                };
                for line in wrap_content(body, CONTENT_WIDTH) {
                    let _ = writeln!(out, "{}", line);
                }

                match &row.state {
                    ItemState::Saving { .. } => out.push_str("  Saving...\n"),
                    ItemState::Deleting => out.push_str("  Deleting...\n"),
                    _ => {}
                }
                if row.owned {
                    let _ = writeln!(out, "  id: {}", row.post.post_id);
                }
                if !row.actions.is_empty() {
                    let labels: Vec<&str> = row.actions.iter().map(|a| a.label()).collect();
                    let _ = writeln!(out, "  [{}]", labels.join("] ["));
                }
                out.push('\n');
            }
        }
    }
    out
}

pub fn render_composer(view: &ComposerView) -> String {
    format!(
        "{}\n{}  [{}{}]\n",
        view.draft,
        view.counter,
        view.submit_label,
        if view.submit_enabled { "" } else { ", disabled" }
    )
}

pub fn render_polls(view: &PollsView, notice: Option<&Notice>) -> String {
    let mut out = String::new();
    push_notice(&mut out, notice);

    let card = match view {
        PollsView::Loading => return out + "Loading polls...\n",
        PollsView::Error(err) => return out + &format!("Error loading polls: {}\n", err),
        PollsView::Empty(msg) => return out + *msg + "\n",
        PollsView::Card(card) => card,
    };

    let prev = if card.can_go_previous { "<" } else { " " };
    let next = if card.can_go_next { ">" } else { " " };
    let _ = writeln!(out, "{} Poll {} of {} {}", prev, card.position, card.total, next);
    let _ = writeln!(out, "{}", card.poll.question);
    if !card.poll.info_text.is_empty() {
        for line in wrap_content(&card.poll.info_text, CONTENT_WIDTH) {
            let _ = writeln!(out, "{}", line);
        }
    }
    let _ = writeln!(out, "  id: {}", card.poll.poll_id);

    match &card.body {
        PollBody::VoteForm {
            selection,
            reason_counter,
            submit_label,
            submit_enabled,
            ..
        } => {
            let choice = selection.map(|a| a.as_str()).unwrap_or("none");
            let _ = writeln!(
                out,
                "  Yes / No (selected: {})  reason {}  [{}{}]",
                choice,
                reason_counter,
                submit_label,
                if *submit_enabled { "" } else { ", disabled" }
            );
        }
        PollBody::ResultsLoading => out.push_str("  Loading results...\n"),
        PollBody::ResultsFailed(msg) => {
            let _ = writeln!(out, "  Failed to load results: {}", msg);
        }
        PollBody::Results(results) => {
            let _ = writeln!(out, "  Yes {:>6}", results.yes);
            let _ = writeln!(out, "  No  {:>6}", results.no);
            let _ = writeln!(out, "  {}", results.total);
        }
    }
    out
}

pub fn render_history(votes: &[PollVote]) -> String {
    if votes.is_empty() {
        return "No poll votes yet.\n".to_string();
    }
    let mut out = String::new();
    for vote in votes {
        let question = vote.question.as_deref().unwrap_or(&vote.poll_id);
        let _ = writeln!(out, "{} → {}", question, vote.answer.as_str());
        if let Some(reason) = vote.reason.as_deref().filter(|r| !r.is_empty()) {
            for line in wrap_content(reason, CONTENT_WIDTH) {
                let _ = writeln!(out, "{}", line);
            }
        }
        if let Some(at) = &vote.voted_at {
            let _ = writeln!(out, "  {}", format_timestamp(at));
        }
    }
    out
}

pub fn render_search(view: &SearchView) -> String {
    let Some(content) = &view.dropdown else {
        return String::new();
    };
    match content {
        DropdownContent::Empty => String::new(),
        DropdownContent::Searching => "Searching...\n".to_string(),
        DropdownContent::NoResults => "No users found\n".to_string(),
        DropdownContent::Failed(msg) => format!("{}\n", msg),
        DropdownContent::Results(links) => links
            .iter()
            .map(|link| format!("{}  ({})\n", link.label, link.href))
            .collect(),
    }
}

pub fn render_profile(view: &ProfileView) -> String {
    let mut out = String::new();
    match view {
        ProfileView::Loading => out.push_str("Loading profile...\n"),
        ProfileView::Error(err) => {
            let _ = writeln!(out, "Error loading profile: {}", err);
        }
        ProfileView::Onboarding => out.push_str("No profile yet. Finish onboarding to set one up.\n"),
        ProfileView::Viewing { profile, notice, .. } => {
            push_notice(&mut out, notice.as_ref());
            let lock = if profile.profile_private { " 🔒" } else { "" };
            let _ = writeln!(out, "{}{}", profile.display_name, lock);
            let _ = writeln!(out, "Alignment: {}", profile.political_alignment.label());
            if !profile.bio.is_empty() {
                for line in wrap_content(&profile.bio, CONTENT_WIDTH) {
                    let _ = writeln!(out, "{}", line);
                }
            }
            let _ = writeln!(out, "Member since {}", format_timestamp(&profile.created_at));
        }
        ProfileView::Editing {
            form,
            bio_counter,
            saving,
            notice,
        } => {
            push_notice(&mut out, notice.as_ref());
            let _ = writeln!(out, "Display name: {}", form.display_name);
            let _ = writeln!(out, "Bio ({}): {}", bio_counter, form.bio);
            let _ = writeln!(out, "Alignment: {}", form.political_alignment.label());
            if *saving {
                out.push_str("Saving...\n");
            }
        }
    }
    out
}
