//! Fixed system roles, stage prompts and the fallback page

use crate::llm::generator::preview;

/// System role for free-form text generation
pub const WEB_DEVELOPER_ROLE: &str = "You are a professional web developer who builds modern websites with \
Tailwind CSS. Generate complete HTML for the user's request and use appropriate Tailwind CSS classes \
for a polished design.";

/// System role for stage 1
pub const PRODUCT_MANAGER_ROLE: &str = "You are a professional product manager who turns user needs into \
detailed product requirement documents.";

/// Mandatory style classes every generated page must use
pub const VISUAL_CONTRACT: &str = "\
1. The head MUST include the Tailwind CSS CDN: <script src=\"https://cdn.tailwindcss.com\"></script>
2. The page background MUST use bg-gray-100
3. The navigation bar MUST use bg-white shadow-sm
4. Content containers MUST use container mx-auto px-4
5. Cards MUST use bg-white rounded-lg shadow-md with hover:shadow-lg transition-shadow
6. Buttons MUST use bg-indigo-600 text-white with hover:bg-indigo-700 transition-colors
7. The footer MUST use bg-white border-t
8. Headings use text-gray-800, body text uses text-gray-600
9. Do not include any JavaScript
10. Do not use inline styles
11. Return only the HTML code, without explanations or any other text";

/// Reference page showing the visual contract applied
const REFERENCE_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AI Generated Site</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-100 min-h-screen">
    <nav class="bg-white shadow-sm py-4">
        <div class="container mx-auto px-4 flex justify-between items-center">
            <div class="text-xl font-bold text-indigo-600">Site Forge</div>
            <div class="flex space-x-4">
                <a href="#" class="text-gray-600 hover:text-indigo-600 px-3 py-2">Home</a>
                <a href="#" class="text-gray-600 hover:text-indigo-600 px-3 py-2">Products</a>
                <a href="#" class="text-gray-600 hover:text-indigo-600 px-3 py-2">Contact</a>
            </div>
        </div>
    </nav>
    <main class="container mx-auto px-4 py-8">
        <div class="grid grid-cols-1 md:grid-cols-3 gap-8 mb-12">
            <div class="bg-white rounded-lg shadow-md p-6 hover:shadow-lg transition-shadow">
                <h2 class="text-2xl font-bold text-gray-800 mb-3">Features</h2>
                <p class="text-gray-600 mb-4">Learn about the core features.</p>
                <button class="bg-indigo-600 text-white px-4 py-2 rounded hover:bg-indigo-700 transition-colors">Learn more</button>
            </div>
        </div>
    </main>
    <footer class="bg-white border-t py-8">
        <div class="container mx-auto px-4 text-center">
            <p class="text-gray-600">&copy; Site Forge. All rights reserved.</p>
        </div>
    </footer>
</body>
</html>"##;

/// System role for stage 2, pinning the visual contract
pub fn html_developer_role() -> String {
    format!(
        "You are a professional web developer who builds modern websites with Tailwind CSS. \
Generate complete HTML for the user's request and strictly follow these rules:\n{}",
        VISUAL_CONTRACT
    )
}

/// Stage 1 user turn: ask for a sectioned requirement document
pub fn requirement_prompt(prompt: &str) -> String {
    format!(
        "Write a detailed website requirement document for the following user request.

User request: {}

Use this structure:

1. Goals and audience:
   - Goal: [the main purpose of the site]
   - Audience: [the target users]

2. Core feature modules:
   - [the main feature modules]

3. Page structure and layout:
   - [the page structure and layout]

4. Design style and color scheme:
   - [the visual style and colors]

5. Interaction details:
   - [the interaction design]

6. Content requirements:
   - [the content to show]

Be detailed and specific so the document can drive HTML generation. \
Answer in the language of the user request.",
        prompt
    )
}

/// Stage 2 user turn: ask for a complete page built from the document
pub fn html_prompt(requirement_doc: &str) -> String {
    format!(
        "Generate a complete HTML page from the following website requirement document.

Requirement document:
{}

Mandatory rules (follow them strictly):
{}

Reference style example:
{}",
        requirement_doc, VISUAL_CONTRACT, REFERENCE_PAGE
    )
}

/// Longest prompt excerpt shown on the fallback page
pub const FALLBACK_TITLE_CHARS: usize = 100;

/// Minimal page substituted when upstream generation fails
pub fn fallback_html(prompt: &str) -> String {
    let title = escape_html(&preview(prompt.trim(), FALLBACK_TITLE_CHARS));
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gradient-to-br from-gray-50 to-gray-100 min-h-screen">
    <div class="max-w-4xl mx-auto p-8">
        <h1 class="text-3xl font-bold text-center text-indigo-600 mb-6">{title}</h1>
        <p class="text-center text-gray-600">This site was generated from your prompt.</p>
    </div>
</body>
</html>"#
    )
}

/// Escape text for safe interpolation into HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
