//! Server-side HTML rendering of the bibliometric dashboard.
//!
//! One page: a search form, optional error box, and when a report is given
//! the metrics, ranking tables, the full record table and export links.
//!
//! The form is posted so an Elsevier key typed into it never lands in a URL.
//! Exports follow the same rule: plain links when the server holds the key,
//! small POST forms carrying the key otherwise.

use crate::bibliometrics::{BibliometricReport, Ranked, RECORD_COLUMNS};
use std::fmt::Write;

/// Form values echoed back into the page
#[derive(Debug, Clone)]
pub struct FormValues {
    pub query: String,
    pub count: usize,
    pub max_results: usize,
    /// Key typed by the user; empty when the server default applies
    pub api_key: String,
    /// Whether the server was started with its own Elsevier key
    pub server_has_key: bool,
}

/// Escape text for HTML element and attribute content
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;max-width:1200px}\
table{border-collapse:collapse;margin-bottom:1.5rem}\
td,th{border:1px solid #ccc;padding:.25rem .5rem;text-align:left}\
.metrics{display:flex;gap:2rem;margin:1rem 0}.metric b{display:block;font-size:1.5rem}\
.error{background:#fdd;padding:.75rem}.info{background:#eef;padding:.75rem}\
textarea{width:100%}";

fn render_form(out: &mut String, form: &FormValues) {
    let placeholder = if form.server_has_key {
        "chave do servidor"
    } else {
        "obrigatória"
    };
    let _ = write!(
        out,
        "<form method=\"post\" action=\"/\">\
         <label>Chave API Elsevier <input type=\"password\" name=\"api_key\" autocomplete=\"off\" placeholder=\"{}\" value=\"{}\"></label><br>\
         <label>Consulta Scopus<br><textarea name=\"query\" rows=\"4\">{}</textarea></label><br>\
         <label>Resultados por página <input type=\"number\" name=\"count\" min=\"10\" max=\"200\" step=\"5\" value=\"{}\"></label> \
         <label>Máximo para analisar <input type=\"number\" name=\"max_results\" min=\"25\" max=\"2000\" step=\"25\" value=\"{}\"></label> \
         <button type=\"submit\">Buscar e analisar</button></form>",
        placeholder,
        escape_html(&form.api_key),
        escape_html(&form.query),
        form.count,
        form.max_results
    );
}

fn render_exports(out: &mut String, form: &FormValues) {
    if form.api_key.is_empty() {
        let params = format!(
            "query={}&count={}&max_results={}",
            urlencoding::encode(&form.query),
            form.count,
            form.max_results
        );
        let _ = write!(
            out,
            "<p><a href=\"/export.csv?{0}\">Baixar CSV</a> | <a href=\"/export.xlsx?{0}\">Baixar Excel</a></p>",
            escape_html(&params)
        );
        return;
    }

    out.push_str("<p>");
    for (path, label) in [("/export.csv", "Baixar CSV"), ("/export.xlsx", "Baixar Excel")] {
        let _ = write!(
            out,
            "<form method=\"post\" action=\"{}\" style=\"display:inline\">\
             <input type=\"hidden\" name=\"api_key\" value=\"{}\">\
             <input type=\"hidden\" name=\"query\" value=\"{}\">\
             <input type=\"hidden\" name=\"count\" value=\"{}\">\
             <input type=\"hidden\" name=\"max_results\" value=\"{}\">\
             <button type=\"submit\">{}</button></form> ",
            path,
            escape_html(&form.api_key),
            escape_html(&form.query),
            form.count,
            form.max_results,
            label
        );
    }
    out.push_str("</p>");
}

fn render_ranking(out: &mut String, title: &str, column: &str, rows: &[Ranked]) {
    if rows.is_empty() {
        return;
    }
    let _ = write!(
        out,
        "<h2>{}</h2><table><tr><th>{}</th><th>publicacoes</th></tr>",
        escape_html(title),
        escape_html(column)
    );
    for row in rows {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&row.label),
            row.count
        );
    }
    out.push_str("</table>");
}

fn render_report(out: &mut String, form: &FormValues, report: &BibliometricReport) {
    let o = &report.overview;
    let year = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());

    let _ = write!(
        out,
        "<p class=\"info\">Documentos coletados: {} (total no Scopus: {})</p>\
         <div class=\"metrics\">\
         <div class=\"metric\">Documentos<b>{}</b></div>\
         <div class=\"metric\">Citações totais<b>{}</b></div>\
         <div class=\"metric\">Média citações<b>{:.2}</b></div>\
         <div class=\"metric\">Período<b>{} - {}</b></div></div>",
        o.documents,
        report.total_results,
        o.documents,
        o.total_citations,
        o.mean_citations,
        year(o.first_year),
        year(o.last_year)
    );

    if !report.by_year.is_empty() {
        out.push_str("<h2>Publicações por ano</h2><table><tr><th>ano</th><th>publicacoes</th></tr>");
        for row in &report.by_year {
            let _ = write!(out, "<tr><td>{}</td><td>{}</td></tr>", row.year, row.publications);
        }
        out.push_str("</table>");
    }

    render_ranking(out, "Top autores", "autor", &report.top_authors);
    render_ranking(out, "Top periódicos", "periodico", &report.top_journals);

    if !report.top_terms.is_empty() {
        out.push_str("<h2>Termos mais frequentes nos títulos</h2><table><tr><th>termo</th><th>frequencia</th></tr>");
        for row in &report.top_terms {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(&row.label),
                row.count
            );
        }
        out.push_str("</table>");
    }

    render_exports(out, form);

    out.push_str("<h2>Base de dados da busca</h2><table><tr>");
    for column in RECORD_COLUMNS {
        let _ = write!(out, "<th>{}</th>", column);
    }
    out.push_str("</tr>");
    for r in &report.records {
        let citacoes = r.citacoes.to_string();
        let ano = r.ano.map(|y| y.to_string()).unwrap_or_default();
        out.push_str("<tr>");
        for cell in [
            r.titulo.as_str(),
            r.autor.as_str(),
            r.data.as_str(),
            r.periodico.as_str(),
            r.tipo.as_str(),
            citacoes.as_str(),
            r.doi.as_str(),
            r.url_scopus.as_str(),
            ano.as_str(),
        ] {
            let _ = write!(out, "<td>{}</td>", escape_html(cell));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
}

/// Render the full dashboard page
pub fn render_page(
    form: &FormValues,
    report: Option<&BibliometricReport>,
    error: Option<&str>,
) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">\
         <title>Bibliometria Scopus</title><style>{}</style></head><body>\
         <h1>Bibliometria Scopus</h1>\
         <p>Digite os termos, busque e receba análise bibliográfica automática.</p>",
        STYLE
    );

    render_form(&mut out, form);

    match (error, report) {
        (Some(message), _) => {
            let _ = write!(out, "<p class=\"error\">{}</p>", escape_html(message));
        }
        (None, Some(report)) if report.records.is_empty() => {
            out.push_str("<p class=\"info\">Nenhum documento retornado para essa busca.</p>");
        }
        (None, Some(report)) => render_report(&mut out, form, report),
        (None, None) => {
            out.push_str("<p class=\"info\">Preencha os campos e clique em 'Buscar e analisar'.</p>");
        }
    }

    out.push_str("</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibliometrics::{Overview, Record};

    fn form() -> FormValues {
        FormValues {
            query: "TITLE(\"ai\") AND <lib>".to_string(),
            count: 25,
            max_results: 200,
            api_key: String::new(),
            server_has_key: true,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_empty_page_prompts_for_input() {
        let html = render_page(&form(), None, None);
        assert!(html.contains("Preencha os campos"));
        assert!(html.contains("TITLE(&quot;ai&quot;) AND &lt;lib&gt;"));
        assert!(html.contains("<form method=\"post\" action=\"/\">"));
        assert!(html.contains("type=\"password\" name=\"api_key\""));
        assert!(html.contains("placeholder=\"chave do servidor\""));
    }

    #[test]
    fn test_key_field_without_server_key() {
        let form = FormValues {
            server_has_key: false,
            ..form()
        };
        let html = render_page(&form, None, None);
        assert!(html.contains("placeholder=\"obrigatória\""));
    }

    #[test]
    fn test_export_links_are_percent_encoded() {
        let report = BibliometricReport {
            records: vec![Record::default()],
            ..Default::default()
        };
        let form = FormValues {
            query: "a b&ç".to_string(),
            ..form()
        };
        let html = render_page(&form, Some(&report), None);
        assert!(html.contains("/export.csv?query=a%20b%26%C3%A7&amp;count=25&amp;max_results=200"));
    }

    #[test]
    fn test_user_key_exports_are_posted() {
        let report = BibliometricReport {
            records: vec![Record::default()],
            ..Default::default()
        };
        let form = FormValues {
            api_key: "k\"1".to_string(),
            ..form()
        };
        let html = render_page(&form, Some(&report), None);
        assert!(html.contains("<form method=\"post\" action=\"/export.xlsx\""));
        assert!(html.contains("<input type=\"hidden\" name=\"api_key\" value=\"k&quot;1\">"));
        assert!(!html.contains("/export.csv?"));
        assert!(!html.contains("k\"1"));
    }

    #[test]
    fn test_error_is_escaped() {
        let html = render_page(&form(), None, Some("Erro HTTP <401>"));
        assert!(html.contains("<p class=\"error\">Erro HTTP &lt;401&gt;</p>"));
    }

    #[test]
    fn test_report_tables() {
        let report = BibliometricReport {
            total_results: 99,
            overview: Overview {
                documents: 1,
                total_citations: 5,
                mean_citations: 5.0,
                first_year: Some(2020),
                last_year: Some(2020),
            },
            top_authors: vec![Ranked { label: "O'Neil <K>".to_string(), count: 1 }],
            records: vec![Record {
                titulo: "Título".to_string(),
                citacoes: 5,
                ano: Some(2020),
                ..Default::default()
            }],
            ..Default::default()
        };
        let html = render_page(&form(), Some(&report), None);

        assert!(html.contains("total no Scopus: 99"));
        assert!(html.contains("<b>5.00</b>"));
        assert!(html.contains("<b>2020 - 2020</b>"));
        assert!(html.contains("O&#39;Neil &lt;K&gt;"));
        assert!(html.contains("/export.csv?query=TITLE%28%22ai%22%29"));
        assert!(html.contains("<td>Título</td>"));
    }

    #[test]
    fn test_empty_report() {
        let report = BibliometricReport::default();
        let html = render_page(&form(), Some(&report), None);
        assert!(html.contains("Nenhum documento retornado"));
    }
}
