//! Server-rendered pages.
//!
//! Deliberately thin: plain markup assembled from the data shapes the
//! engine and data layer produce. User-entered text is escaped; puzzle and
//! gate content fields are admin-authored markup and render verbatim.

use axum::response::Html;

use crate::{
    game::{GameState, GateStatus, PuzzleStatus, SidebarItem},
    models::{Gate, HouseScore, LeaderboardRow, Puzzle, Run, User, HOUSES},
    utils::format_place,
};

pub fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} · Gatehunt</title>\n\
         <link rel=\"stylesheet\" href=\"/static/style.css\">\n\
         </head>\n<body>\n{}\n</body>\n</html>",
        escape(title),
        body
    ))
}

fn error_block(error: Option<&str>) -> String {
    match error {
        Some(message) => format!("<p class=\"error\">{}</p>", escape(message)),
        None => String::new(),
    }
}

fn house_options() -> String {
    HOUSES
        .iter()
        .map(|house| format!("<option value=\"{house}\">{house}</option>"))
        .collect()
}

fn house_table(house_scores: &[HouseScore]) -> String {
    let rows: String = house_scores
        .iter()
        .map(|hs| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&hs.house),
                hs.total_score
            )
        })
        .collect();
    format!("<table class=\"houses\"><tr><th>House</th><th>Score</th></tr>{rows}</table>")
}

fn sidebar(state: &GameState) -> String {
    let items: String = state
        .items
        .iter()
        .map(|item| match item {
            SidebarItem::Gate(gate) => {
                let class = if gate.locked { "gate locked" } else { "gate open" };
                if gate.can_view && gate.locked {
                    format!(
                        "<li class=\"{class}\"><a href=\"/gate/{}\">{}</a></li>",
                        gate.group_index,
                        escape(&gate.title)
                    )
                } else {
                    format!("<li class=\"{class}\">{}</li>", escape(&gate.title))
                }
            }
            SidebarItem::Puzzle(puzzle) => {
                let class = match (puzzle.solved, puzzle.unlocked) {
                    (true, _) => "puzzle solved",
                    (false, true) => "puzzle unlocked",
                    (false, false) => "puzzle locked",
                };
                if puzzle.unlocked {
                    format!(
                        "<li class=\"{class}\"><a href=\"/puzzle/{}\">{}</a></li>",
                        puzzle.puzzle.id,
                        escape(&puzzle.puzzle.title)
                    )
                } else {
                    format!("<li class=\"{class}\">{}</li>", escape(&puzzle.puzzle.title))
                }
            }
        })
        .collect();
    format!("<nav class=\"sidebar\"><ul>{items}</ul></nav>")
}

pub struct PlayContext<'a> {
    pub display_name: &'a str,
    pub run: &'a Run,
    pub state: &'a GameState,
    pub place_text: &'a str,
    pub house_scores: &'a [HouseScore],
}

fn chrome(ctx: &PlayContext<'_>, main: &str) -> String {
    format!(
        "<header><span>{}</span><span>Place: {}</span>\
         <span>Started {} UTC</span>\
         <a href=\"/leaderboard\">Leaderboard</a><a href=\"/account\">Account</a>\
         <form method=\"post\" action=\"/logout\"><button>Sign out</button></form></header>\
         <div class=\"columns\">{}<main>{}</main>{}</div>",
        escape(ctx.display_name),
        escape(ctx.place_text),
        ctx.run.start_time.format("%H:%M"),
        sidebar(ctx.state),
        main,
        house_table(ctx.house_scores),
    )
}

pub fn landing() -> Html<String> {
    layout(
        "Welcome",
        "<h1>The Hunt Awaits</h1>\
         <p><a href=\"/begin\">Begin a new hunt</a></p>\
         <p><a href=\"/return\">Returning? Sign back in</a></p>",
    )
}

pub fn intro() -> Html<String> {
    layout(
        "Begin",
        "<h1>How it works</h1>\
         <p>Solve each puzzle to reveal the next. Between stages, timed gates\
         hold everyone until the appointed hour. Your house shares in every\
         finisher's score.</p>\
         <p><a href=\"/login\">Choose your house and begin</a></p>",
    )
}

pub fn return_form(error: Option<&str>) -> Html<String> {
    layout(
        "Sign back in",
        &format!(
            "<h1>Welcome back</h1>{}\
             <form method=\"post\" action=\"/return\">\
             <label>Username <input name=\"username\" required></label>\
             <button>Continue</button></form>",
            error_block(error)
        ),
    )
}

pub fn login_form(error: Option<&str>) -> Html<String> {
    layout(
        "Register",
        &format!(
            "<h1>Join the hunt</h1>{}\
             <form method=\"post\" action=\"/login\">\
             <label>First name <input name=\"first_name\" required></label>\
             <label>Last name <input name=\"last_name\" required></label>\
             <label>House <select name=\"house\">{}</select></label>\
             <label>Username (optional) <input name=\"username\"></label>\
             <button>Begin</button></form>",
            error_block(error),
            house_options()
        ),
    )
}

pub fn account_page(user: &User, error: Option<&str>, success: Option<&str>) -> Html<String> {
    let notice = match success {
        Some(message) => format!("<p class=\"success\">{}</p>", escape(message)),
        None => String::new(),
    };
    layout(
        "Account",
        &format!(
            "<h1>Account</h1>{}{}\
             <p>Username: {} · House: {}</p>\
             <form method=\"post\" action=\"/account\">\
             <label>First name <input name=\"first_name\" value=\"{}\" required></label>\
             <label>Last name <input name=\"last_name\" value=\"{}\" required></label>\
             <button>Save</button></form>\
             <p><a href=\"/play\">Back to the hunt</a></p>",
            error_block(error),
            notice,
            escape(&user.username),
            escape(&user.house),
            escape(user.first_name.as_deref().unwrap_or("")),
            escape(user.last_name.as_deref().unwrap_or("")),
        ),
    )
}

pub fn play_page(ctx: &PlayContext<'_>) -> Html<String> {
    let callout = if let Some(puzzle) = &ctx.state.next_puzzle {
        format!(
            "<p>Your next puzzle: <a href=\"/puzzle/{}\">{}</a></p>",
            puzzle.puzzle.id,
            escape(&puzzle.puzzle.title)
        )
    } else if let Some(gate) = &ctx.state.blocking_gate {
        format!(
            "<p>The way forward opens later: <a href=\"/gate/{}\">{}</a></p>",
            gate.group_index,
            escape(&gate.title)
        )
    } else {
        "<p>Nothing to solve yet. Check back soon.</p>".to_string()
    };
    let main = format!(
        "<h1>The hunt is on</h1>\
         <p>{} of {} solved.</p>{}",
        ctx.state.solved_count, ctx.state.total_count, callout
    );
    layout("Play", &chrome(ctx, &main))
}

fn media_block(puzzle: &Puzzle) -> String {
    let mut blocks = String::new();
    if let Some(url) = &puzzle.media_url {
        blocks.push_str(&format!(
            "<img class=\"media\" src=\"{}\" alt=\"\">",
            escape(url)
        ));
    }
    if let Some(embed) = &puzzle.media_embed_html {
        blocks.push_str(embed);
    }
    if let Some(custom) = &puzzle.custom_html {
        blocks.push_str(custom);
    }
    blocks
}

pub fn puzzle_page(
    ctx: &PlayContext<'_>,
    puzzle: &PuzzleStatus,
    error: Option<&str>,
) -> Html<String> {
    let main = format!(
        "<h1>{}</h1><p class=\"clue\">{}</p>{}{}\
         <form method=\"post\" action=\"/answer\">\
         <input type=\"hidden\" name=\"puzzle_id\" value=\"{}\">\
         <label>Answer <input name=\"answer\" autofocus autocomplete=\"off\"></label>\
         <button>Submit</button></form>",
        escape(&puzzle.puzzle.title),
        escape(&puzzle.puzzle.clue),
        media_block(&puzzle.puzzle),
        error_block(error),
        puzzle.puzzle.id,
    );
    layout(&puzzle.puzzle.title, &chrome(ctx, &main))
}

pub fn gate_page(ctx: &PlayContext<'_>, gate: &GateStatus) -> Html<String> {
    let main = format!(
        "<h1>{}</h1>{}\
         <p class=\"countdown\" data-unlock-at=\"{}\" data-seconds=\"{}\">\
         Opens at {} UTC</p>",
        escape(&gate.title),
        gate.content_html,
        gate.unlock_at.to_rfc3339(),
        gate.seconds_until_open,
        gate.unlock_at.format("%Y-%m-%d %H:%M"),
    );
    layout(&gate.title, &chrome(ctx, &main))
}

pub fn congratulations_page(display_name: &str, place_text: &str, run: &Run) -> Html<String> {
    layout(
        "Congratulations",
        &format!(
            "<h1>Congratulations, {}!</h1>\
             <p>You finished {} with a time of {} seconds and a score of {}.</p>\
             <p><a href=\"/leaderboard\">See the leaderboard</a></p>",
            escape(display_name),
            escape(place_text),
            run.total_seconds.unwrap_or(0),
            run.score.unwrap_or(0),
        ),
    )
}

pub fn leaderboard_page(scores: &[LeaderboardRow], house_scores: &[HouseScore]) -> Html<String> {
    let rows: String = scores
        .iter()
        .map(|row| {
            let name = match (&row.first_name, &row.last_name) {
                (Some(first), Some(last)) => format!("{first} {last}"),
                _ => row.username.clone(),
            };
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                format_place(row.rank as i64),
                escape(&name),
                escape(&row.house),
                row.total_seconds,
                row.score
            )
        })
        .collect();
    layout(
        "Leaderboard",
        &format!(
            "<h1>Leaderboard</h1>\
             <table><tr><th>Place</th><th>Hunter</th><th>House</th>\
             <th>Time (s)</th><th>Score</th></tr>{}</table>{}\
             <p><a href=\"/play\">Back to the hunt</a></p>",
            rows,
            house_table(house_scores)
        ),
    )
}

pub fn admin_login_page(error: Option<&str>) -> Html<String> {
    layout(
        "Admin",
        &format!(
            "<h1>Admin sign-in</h1>{}\
             <form method=\"post\" action=\"/admin/login\">\
             <label>Password <input type=\"password\" name=\"password\"></label>\
             <button>Sign in</button></form>",
            error_block(error)
        ),
    )
}

fn puzzle_form(action: &str, puzzle: Option<&Puzzle>, submit: &str) -> String {
    let value = |field: fn(&Puzzle) -> String| match puzzle {
        Some(p) => escape(&field(p)),
        None => String::new(),
    };
    format!(
        "<form method=\"post\" action=\"{action}\">\
         <label>Title <input name=\"title\" value=\"{}\"></label>\
         <label>Clue <textarea name=\"clue\">{}</textarea></label>\
         <label>Answer <input name=\"answer\" value=\"{}\"></label>\
         <label>Group <input name=\"group_index\" value=\"{}\"></label>\
         <label>Order <input name=\"order_index\" value=\"{}\"></label>\
         <label>Media URL <input name=\"media_url\" value=\"{}\"></label>\
         <label>Embed HTML <textarea name=\"media_embed_html\">{}</textarea></label>\
         <label>Custom HTML <textarea name=\"custom_html\">{}</textarea></label>\
         <button>{submit}</button></form>",
        value(|p| p.title.clone()),
        value(|p| p.clue.clone()),
        value(|p| p.answer.clone()),
        value(|p| p.group_index.to_string()),
        value(|p| p.order_index.to_string()),
        value(|p| p.media_url.clone().unwrap_or_default()),
        value(|p| p.media_embed_html.clone().unwrap_or_default()),
        value(|p| p.custom_html.clone().unwrap_or_default()),
    )
}

fn gate_form(action: &str, gate: Option<&Gate>, submit: &str) -> String {
    let unlock_value = match gate {
        Some(g) => g.unlock_at.format("%Y-%m-%dT%H:%M").to_string(),
        None => String::new(),
    };
    format!(
        "<form method=\"post\" action=\"{action}\">\
         <label>Group <input name=\"group_index\" value=\"{}\"></label>\
         <label>Title <input name=\"title\" value=\"{}\"></label>\
         <label>Opens (UTC) <input type=\"datetime-local\" name=\"unlock_at\" value=\"{unlock_value}\"></label>\
         <label>Content HTML <textarea name=\"content_html\">{}</textarea></label>\
         <button>{submit}</button></form>",
        gate.map(|g| g.group_index.to_string()).unwrap_or_default(),
        gate.map(|g| escape(&g.title)).unwrap_or_default(),
        gate.map(|g| escape(&g.content_html)).unwrap_or_default(),
    )
}

pub fn admin_page(puzzles: &[Puzzle], gates: &[Gate], error: Option<&str>) -> Html<String> {
    let puzzle_rows: String = puzzles
        .iter()
        .map(|p| {
            format!(
                "<section class=\"card\"><h3>#{} (group {}, order {}): {}</h3>{}\
                 <form method=\"post\" action=\"/admin/puzzles/{}/delete\">\
                 <button>Delete</button></form></section>",
                p.id,
                p.group_index,
                p.order_index,
                escape(&p.title),
                puzzle_form(&format!("/admin/puzzles/{}", p.id), Some(p), "Update"),
                p.id,
            )
        })
        .collect();
    let gate_rows: String = gates
        .iter()
        .map(|g| {
            format!(
                "<section class=\"card\"><h3>Gate for group {}: {}</h3>{}\
                 <form method=\"post\" action=\"/admin/gates/{}/delete\">\
                 <button>Delete</button></form></section>",
                g.group_index,
                escape(&g.title),
                gate_form(&format!("/admin/gates/{}", g.id), Some(g), "Update"),
                g.id,
            )
        })
        .collect();
    layout(
        "Admin",
        &format!(
            "<h1>Admin</h1>{}\
             <form method=\"post\" action=\"/admin/logout\"><button>Sign out</button></form>\
             <h2>New puzzle</h2>{}\
             <h2>Puzzles</h2>{}\
             <h2>New or replacement gate</h2>{}\
             <h2>Gates</h2>{}",
            error_block(error),
            puzzle_form("/admin/puzzles", None, "Create"),
            puzzle_rows,
            gate_form("/admin/gates", None, "Upsert"),
            gate_rows,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<b>\"tom & jerry's\"</b>"),
            "&lt;b&gt;&quot;tom &amp; jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_login_form_lists_every_house() {
        let Html(page) = login_form(None);
        for house in HOUSES {
            assert!(page.contains(house));
        }
    }
}
