//! HTML form pages for pasting a document and viewing the result.

use axum::response::Html;

/// What the result area of a page shows.
#[derive(Debug, Default)]
pub struct PageOutput {
    /// Pretty-printed JSON result or error object.
    pub json: Option<String>,
    /// Plain error text.
    pub error: Option<String>,
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            max-width: 1100px;
            margin: 0 auto;
            padding: 20px;
        }}
        textarea {{
            width: 100%;
            font-family: 'Courier New', monospace;
        }}
        pre {{
            background: #f4f4f4;
            padding: 12px;
            overflow-x: auto;
        }}
        .error {{
            color: #b00020;
        }}
    </style>
</head>
<body>
    <h1>{title}</h1>
{body}
</body>
</html>
"#
    ))
}

/// The CDA to FHIR page. `output` is `None` before anything is submitted.
pub fn cda2fhir_page(cda_input: &str, output: Option<&PageOutput>) -> Html<String> {
    let mut body = format!(
        r#"    <form method="post" action="/cda2fhir/">
        <label for="cda-input">C-CDA XML</label>
        <textarea id="cda-input" name="cda-input" rows="20">{}</textarea>
        <button type="submit">Convert</button>
    </form>
"#,
        escape_html(cda_input)
    );

    if let Some(output) = output {
        body.push_str("    <h2>FHIR Output</h2>\n");
        push_output(&mut body, "fhir-output", output);
    }

    layout("CDA to FHIR", &body)
}

/// The HL7 lab checker page. `output` is `None` before anything is submitted.
pub fn labcheck_page(hl7_input: &str, output: Option<&PageOutput>) -> Html<String> {
    let mut body = format!(
        r#"    <form method="post" action="/labcheck/">
        <label for="hl7-input">HL7 v2 message</label>
        <textarea id="hl7-input" name="hl7-input" rows="20">{}</textarea>
        <button type="submit">Check</button>
    </form>
"#,
        escape_html(hl7_input)
    );

    if let Some(output) = output {
        body.push_str("    <h2>Parsed Message</h2>\n");
        push_output(&mut body, "parsed-json", output);
    }

    layout("HL7 Lab Check", &body)
}

fn push_output(body: &mut String, id: &str, output: &PageOutput) {
    if let Some(error) = &output.error {
        body.push_str(&format!(
            "    <p class=\"error\" id=\"error\">{}</p>\n",
            escape_html(error)
        ));
    }
    if let Some(json) = &output.json {
        body.push_str(&format!(
            "    <pre id=\"{id}\">{}</pre>\n",
            escape_html(json)
        ));
    }
}
