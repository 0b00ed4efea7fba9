//! HTML for the form page and the results page.
//!
//! The form posts JSON to `/` and polls `/progress`; once progress hits 100
//! the browser is sent to `/results`.

const STYLE: &str = r#"<style>
    body {
        place-items: center;
        align-items: center;
        text-align: left;
        padding: 20px;
    }
    h1 {
        text-align: center;
    }
    .container {
        border: 1px solid #ccc;
        padding: 20px;
        margin-top: 20px;
    }
    progress {
        width: 100%;
    }
</style>"#;

const FORM_BODY: &str = r#"<h1>Bearblog Sentiment Scores</h1>
<body>
<p>Find a bearblog you like <a href="https://bearblog.dev/discover">here</a>. Copy and paste the domain below.</p>
<form id="scrape-form">
    <b>Bearblog Domain:</b> <input type="text" name="domain" id="domain">
    <input type="submit" value="Do the thing">
</form>
<div class="container" id="status-box" hidden>
    <p id="status-text">Starting&hellip;</p>
    <progress id="progress-bar" max="100" value="0"></progress>
</div>
<div class="container">
    <p>You'll receive the sentiment analysis results for each post under that domain.</p>
    <p>Sentiment scores:</p>
    <i>Example scores:</i> <code>{'neg': 0.046, 'neu': 0.82, 'pos': 0.134, 'compound': 0.9851}</code>
    <ul>
        <li>Negative (neg): the proportion of the text that reads as negative. Range: [0, 1]. A neg of 0.046 means 4.6% of the text is negative.</li>
        <li>Neutral (neu): the proportion of the text that reads as neutral. Range: [0, 1]. A neu of 0.82 means 82% of the text is neutral.</li>
        <li>Positive (pos): the proportion of the text that reads as positive. Range: [0, 1]. A pos of 0.134 means 13.4% of the text is positive.</li>
        <li>Compound (compound): a normalized, weighted composite of the three scores above. Range: [-1, 1]. Close to 1 is strongly positive, close to -1 strongly negative, around 0 neutral.</li>
    </ul>
</div>
<script>
const form = document.getElementById("scrape-form");
const box = document.getElementById("status-box");
const text = document.getElementById("status-text");
const bar = document.getElementById("progress-bar");

async function poll() {
    const resp = await fetch("/progress");
    const body = await resp.json();
    if (body.progress < 0) {
        text.textContent = "Something went wrong while reading that blog.";
        return;
    }
    bar.value = body.progress;
    text.textContent = "Scoring posts: " + body.progress + "%";
    if (body.progress >= 100) {
        window.location.href = "/results";
        return;
    }
    setTimeout(poll, 1000);
}

form.addEventListener("submit", async (ev) => {
    ev.preventDefault();
    box.hidden = false;
    const domain = document.getElementById("domain").value;
    const resp = await fetch("/", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ domain }),
    });
    if (resp.status === 409) {
        text.textContent = "A scrape is already running, following it instead.";
    } else if (resp.status !== 202) {
        text.textContent = "Could not start the scrape.";
        return;
    }
    poll();
});
</script>
</body>"#;

pub const NO_RESULTS: &str = "No results yet";
pub const RUN_FAILED: &str = "The last run failed: the blog listing could not be read.";
pub const RUN_CANCELLED: &str = "The last run was cancelled or ran out of time before finishing.";

pub fn form_page() -> String {
    format!("<!doctype html>\n<title>Bearblog Scraper</title>\n{STYLE}\n{FORM_BODY}\n")
}

/// What the results page should show.
pub enum ResultsView<'a> {
    Report(&'a str),
    Failed,
    Cancelled,
    Empty,
}

pub fn results_page(view: ResultsView<'_>) -> String {
    let inner = match view {
        ResultsView::Report(text) => format!(
            "<h2>Sentiment Analysis Results</h2>\n\
             <p><a href=\"/download\">Download report</a></p>\n\
             <pre style=\"max-height: 600px; overflow-y: scroll; white-space: pre-wrap;\">{}</pre>",
            html_escape::encode_text(text)
        ),
        ResultsView::Failed => format!("<p>{RUN_FAILED}</p>"),
        ResultsView::Cancelled => format!("<p>{RUN_CANCELLED}</p>"),
        ResultsView::Empty => format!("<p>{NO_RESULTS}</p>"),
    };
    format!(
        "<!doctype html>\n<title>Bearblog Scraper</title>\n{STYLE}\n<body>\n<h1>Bearblog Sentiment Scores</h1>\n\
         <div class=\"container\">\n{inner}\n</div>\n<p><a href=\"/\">Back</a></p>\n</body>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_text_is_escaped() {
        let html = results_page(ResultsView::Report("Title: <script>alert(1)</script> & co"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn placeholders() {
        assert!(results_page(ResultsView::Empty).contains(NO_RESULTS));
        assert!(results_page(ResultsView::Failed).contains(RUN_FAILED));
        assert!(results_page(ResultsView::Cancelled).contains(RUN_CANCELLED));
        assert!(form_page().contains("name=\"domain\""));
    }
}
