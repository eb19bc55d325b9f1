//! Landing page
//!
//! - GET / and GET /index.html

use axum::response::Html;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>rrdgate</title>
</head>
<body>
<h1>rrdgate</h1>
<p>Query gateway for round-robin metric files.</p>
<ul>
<li><code>GET|POST /query</code> - evaluate <code>DEF</code>/<code>CDEF</code> queries</li>
<li><code>GET|POST /suggest/metrics</code> - autocomplete metric paths</li>
<li><code>GET /health</code> - service status</li>
</ul>
<p>Example: <code>/query?start=-1h&amp;step=1m&amp;query=DEF:load=server1/load/load:shortterm:AVERAGE</code></p>
</body>
</html>
"#;

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
