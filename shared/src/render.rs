//! HTML rendering of a saved site document.

use crate::config::Assets;
use crate::images::resolve_image_url;
use crate::templates;
use crate::types::{InputKind, SiteDocument, TemplateType};

/// Fields placed by the page skeleton rather than in the generic sections.
const LAYOUT_FIELDS: &[&str] = &[
    "headline",
    "subtitulo",
    "descricao",
    "whatsapp",
    "textoBotao",
    "sobre",
    "endereco",
    "email",
    "videoUrl",
    "tituloVideo",
];

/// Textarea fields rendered as one list item per line.
const LIST_FIELDS: &[&str] = &["beneficios", "listaServicos"];

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| format!("<p>{}</p>", html_escape(block).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn list_items(text: &str) -> String {
    let items: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<li>{}</li>", html_escape(line)))
        .collect();
    format!("<ul>{}</ul>", items.join(""))
}

/// `wa.me` link for a phone number; Brazilian numbers without a country
/// code get `55` prepended.
pub fn whatsapp_link(number: &str) -> Option<String> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        0 => None,
        10 | 11 => Some(format!("https://wa.me/55{}", digits)),
        _ => Some(format!("https://wa.me/{}", digits)),
    }
}

/// Turn a YouTube or Vimeo page URL into its embeddable form.
pub fn embed_video_url(url: &str) -> String {
    let url = url.trim();
    let without_scheme = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    if let Some(query) = without_scheme.strip_prefix("youtube.com/watch?") {
        if let Some(id) = query
            .split('&')
            .find_map(|param| param.strip_prefix("v="))
        {
            return format!("https://www.youtube.com/embed/{}", id);
        }
    }
    if let Some(rest) = without_scheme.strip_prefix("youtu.be/") {
        let id = rest.split(['?', '&']).next().unwrap_or(rest);
        return format!("https://www.youtube.com/embed/{}", id);
    }
    if let Some(rest) = without_scheme.strip_prefix("vimeo.com/") {
        let id = rest.split(['?', '/']).next().unwrap_or(rest);
        return format!("https://player.vimeo.com/video/{}", id);
    }
    url.to_string()
}

/// Render a complete standalone HTML page for a site.
pub fn render_site(site: &SiteDocument, assets: &Assets) -> String {
    let field = |key: &str| {
        site.fields
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    };
    let image = |slot: &str| {
        site.images
            .get(slot)
            .and_then(|raw| resolve_image_url(raw, assets))
    };

    let headline = field("headline").unwrap_or_default();
    let whatsapp = field("whatsapp").and_then(whatsapp_link);
    let mut body = String::new();

    // Hero
    body.push_str("<header class=\"hero\">\n");
    if let Some(logo) = image("logo") {
        body.push_str(&format!(
            "<img class=\"logo\" src=\"{}\" alt=\"Logo\">\n",
            html_escape(&logo)
        ));
    }
    body.push_str(&format!("<h1>{}</h1>\n", html_escape(headline)));
    if let Some(subtitle) = field("subtitulo") {
        body.push_str(&format!("<p class=\"subtitle\">{}</p>\n", html_escape(subtitle)));
    }
    if let Some(hero) = image("imagemPrincipal") {
        body.push_str(&format!(
            "<img class=\"hero-image\" src=\"{}\" alt=\"{}\">\n",
            html_escape(&hero),
            html_escape(headline)
        ));
    }
    if let Some(link) = &whatsapp {
        let label = field("textoBotao").unwrap_or("Fale conosco");
        body.push_str(&format!(
            "<a class=\"cta\" href=\"{}\">{}</a>\n",
            html_escape(link),
            html_escape(label)
        ));
    }
    body.push_str("</header>\n");

    if let Some(description) = field("descricao") {
        body.push_str(&format!(
            "<section class=\"description\">\n{}\n</section>\n",
            paragraphs(description)
        ));
    }

    if let Some(video) = field("videoUrl") {
        body.push_str("<section class=\"video\">\n");
        if let Some(title) = field("tituloVideo") {
            body.push_str(&format!("<h2>{}</h2>\n", html_escape(title)));
        }
        body.push_str(&format!(
            "<iframe src=\"{}\" allowfullscreen></iframe>\n</section>\n",
            html_escape(&embed_video_url(video))
        ));
    }

    // Variation fields, in schema order
    let schema = templates::resolve(site.template_type.as_str(), &site.variation_id);
    let mut variation = String::new();
    for descriptor in schema
        .iter()
        .filter(|descriptor| !LAYOUT_FIELDS.contains(&descriptor.key))
    {
        let Some(value) = field(descriptor.key) else {
            continue;
        };
        let html = if descriptor.key.starts_with("titulo") {
            format!("<h2>{}</h2>", html_escape(value))
        } else if LIST_FIELDS.contains(&descriptor.key) {
            list_items(value)
        } else if descriptor.input_kind == InputKind::Textarea {
            paragraphs(value)
        } else {
            format!(
                "<p class=\"field-{}\">{}</p>",
                descriptor.key,
                html_escape(value)
            )
        };
        variation.push_str(&html);
        variation.push('\n');
    }
    if !variation.is_empty() {
        body.push_str(&format!(
            "<section class=\"{}\">\n{}</section>\n",
            html_escape(&site.variation_id),
            variation
        ));
    }

    if site.template_type == TemplateType::Institucional {
        if let Some(about) = field("sobre") {
            body.push_str("<section class=\"about\">\n<h2>Sobre</h2>\n");
            if let Some(picture) = image("imagemSobre") {
                body.push_str(&format!(
                    "<img src=\"{}\" alt=\"Sobre\">\n",
                    html_escape(&picture)
                ));
            }
            body.push_str(&paragraphs(about));
            body.push_str("\n</section>\n");
        }
    }

    // Contact footer
    body.push_str("<footer class=\"contact\">\n");
    if let Some(link) = &whatsapp {
        body.push_str(&format!(
            "<a class=\"whatsapp\" href=\"{}\">WhatsApp: {}</a>\n",
            html_escape(link),
            html_escape(field("whatsapp").unwrap_or_default())
        ));
    }
    if let Some(email) = field("email") {
        body.push_str(&format!(
            "<a class=\"email\" href=\"mailto:{0}\">{0}</a>\n",
            html_escape(email)
        ));
    }
    if let Some(address) = field("endereco") {
        body.push_str(&format!("<address>{}</address>\n", html_escape(address)));
    }
    body.push_str("</footer>\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <meta name="description" content="{summary}">
</head>
<body class="template-{template}">
{body}</body>
</html>
"#,
        title = html_escape(headline),
        summary = html_escape(field("subtitulo").unwrap_or(headline)),
        template = html_escape(&site.template_id),
        body = body,
    )
}
