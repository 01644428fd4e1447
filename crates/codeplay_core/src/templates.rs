//! Default sources used at startup and on reset

use once_cell::sync::Lazy;

use crate::sources::SourceTriple;

pub const DEFAULT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>My Code Play Editor</title>
</head>
<body>
    <div class="container">
        <h1>Welcome to CodePlay!</h1>
        <p>Edit this code and see the changes in real-time.</p>
        <div id="output"></div>
    </div>
</body>
</html>"#;

pub const DEFAULT_CSS: &str = r#"body {
    font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    margin: 0;
    padding: 20px;
    min-height: 100vh;
    color: white;
}

.container {
    max-width: 800px;
    margin: 0 auto;
    text-align: center;
    padding: 40px 20px;
}

h1 {
    font-size: 2.5rem;
    margin-bottom: 20px;
    text-shadow: 2px 2px 4px rgba(0,0,0,0.3);
}

p {
    font-size: 1.2rem;
    margin-bottom: 20px;
    opacity: 0.9;
}

#output {
    margin-top: 30px;
    padding: 20px;
    background: rgba(255,255,255,0.1);
    border-radius: 10px;
    backdrop-filter: blur(10px);
}"#;

pub const DEFAULT_JS: &str = r#"// Write your JavaScript code here
document.addEventListener('DOMContentLoaded', function() {
    const output = document.getElementById('output');
    if (output) {
        output.innerHTML = '<h3>✨ Start coding to see the magic happen!</h3><p>Try editing the HTML, CSS, or JavaScript files.</p>';
    }
});"#;

/// The default triple, built once.
pub static DEFAULT_SOURCES: Lazy<SourceTriple> =
    Lazy::new(|| SourceTriple::new(DEFAULT_HTML, DEFAULT_CSS, DEFAULT_JS));
