//! Flight chunk collection from `self.__next_f.push` scripts
//!
//! Next.js streams its server component payload as a series of inline
//! scripts, each pushing `[tag, "text"]` arrays onto a global queue. The
//! scripts are parsed with SWC (never evaluated) and only the exact push
//! call shape is accepted.

use scraper::{Html, Selector};
use swc_common::{sync::Lrc, FileName, SourceMap};
use swc_ecma_ast::*;
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

use crate::error::{FlightError, Result};
use crate::options::FlightOptions;

/// Payload text gathered from every data script on a page
#[derive(Debug, Default)]
pub(crate) struct CollectedChunks {
    pub raw: String,
    pub scripts: usize,
    pub skipped_scripts: usize,
    pub chunks: usize,
    /// Chunks whose string literal held lone surrogates, kept with U+FFFD
    pub lossy_chunks: usize,
}

/// One `[tag, payload]` array pushed onto the queue
#[derive(Debug, PartialEq)]
struct PushEntry {
    tag: f64,
    payload: Option<String>,
    lossy: bool,
}

/// Concatenate the data-tag payloads of every matching script, in document order.
///
/// Fails only when no script mentions the marker at all; scripts that do not
/// parse are skipped so the remaining chunks still produce a usable buffer.
pub(crate) fn collect_chunks(html: &str, options: &FlightOptions) -> Result<CollectedChunks> {
    let document = Html::parse_document(html);
    let structural_absence = || FlightError::StructuralAbsence {
        marker: options.marker.clone(),
    };

    let selector = match Selector::parse("script") {
        Ok(s) => s,
        Err(_) => return Err(structural_absence()),
    };

    let data_tag = options.data_tag as f64;
    let mut collected = CollectedChunks::default();

    for element in document.select(&selector) {
        let script_text = element.text().collect::<String>();
        if !script_text.contains(options.marker.as_str()) {
            continue;
        }
        collected.scripts += 1;

        let Some(entries) = parse_push_entries(&script_text, options) else {
            collected.skipped_scripts += 1;
            tracing::debug!(
                target: "flight_parser::chunks",
                script_len = script_text.len(),
                "Skipping data script that failed to parse"
            );
            continue;
        };

        for entry in entries {
            if entry.tag != data_tag {
                continue;
            }
            if let Some(payload) = entry.payload {
                collected.raw.push_str(&payload);
                collected.chunks += 1;
                if entry.lossy {
                    collected.lossy_chunks += 1;
                }
            }
        }
    }

    if collected.scripts == 0 {
        return Err(structural_absence());
    }

    tracing::debug!(
        target: "flight_parser::chunks",
        scripts = collected.scripts,
        skipped = collected.skipped_scripts,
        chunks = collected.chunks,
        lossy = collected.lossy_chunks,
        raw_len = collected.raw.len(),
        "Collected flight chunks"
    );

    Ok(collected)
}

/// Parse a script and pull out every `[tag, payload]` pushed onto the queue
fn parse_push_entries(source: &str, options: &FlightOptions) -> Option<Vec<PushEntry>> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon.into(), source.to_string());

    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        Default::default(),
        StringInput::from(&*fm),
        None,
    );

    let mut parser = Parser::new_from(lexer);
    let script = parser.parse_script().ok()?;

    let mut entries = Vec::new();
    for stmt in &script.body {
        if let Stmt::Expr(expr_stmt) = stmt {
            collect_from_expr(&expr_stmt.expr, options, &mut entries);
        }
    }

    Some(entries)
}

fn collect_from_expr(expr: &Expr, options: &FlightOptions, entries: &mut Vec<PushEntry>) {
    match expr {
        // a.push(x), b.push(y)
        Expr::Seq(seq) => {
            for expr in &seq.exprs {
                collect_from_expr(expr, options, entries);
            }
        }
        Expr::Paren(paren) => collect_from_expr(&paren.expr, options, entries),
        Expr::Call(call) if is_queue_push(call, options) => {
            entries.extend(call.args.iter().filter_map(|arg| push_entry(&arg.expr)));
        }
        _ => {}
    }
}

/// Check if a call is `<root>.<queue>.push(...)` or `(<root>.<queue> = ...).push(...)`
fn is_queue_push(call: &CallExpr, options: &FlightOptions) -> bool {
    let Callee::Expr(callee) = &call.callee else {
        return false;
    };
    let Expr::Member(member) = &**callee else {
        return false;
    };
    match &member.prop {
        MemberProp::Ident(prop) if prop.sym.as_str() == "push" => is_queue_ref(&member.obj, options),
        _ => false,
    }
}

fn is_queue_ref(expr: &Expr, options: &FlightOptions) -> bool {
    match expr {
        Expr::Member(member) => names_queue(member, options),
        Expr::Paren(paren) => is_queue_ref(&paren.expr, options),
        Expr::Assign(assign) => match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => names_queue(member, options),
            _ => false,
        },
        _ => false,
    }
}

fn names_queue(member: &MemberExpr, options: &FlightOptions) -> bool {
    let on_root = matches!(&*member.obj, Expr::Ident(obj) if obj.sym.as_str() == options.root);
    on_root && matches!(&member.prop, MemberProp::Ident(prop) if prop.sym.as_str() == options.queue)
}

/// Convert a pushed array literal into a tag/payload pair
fn push_entry(expr: &Expr) -> Option<PushEntry> {
    let Expr::Array(arr) = expr else {
        return None;
    };

    let tag = match arr.elems.first() {
        Some(Some(ExprOrSpread { expr, .. })) => match &**expr {
            Expr::Lit(Lit::Num(n)) => n.value,
            _ => return None,
        },
        _ => return None,
    };

    let mut lossy = false;
    let payload = match arr.elems.get(1) {
        Some(Some(ExprOrSpread { expr, .. })) => match &**expr {
            Expr::Lit(Lit::Str(s)) => match s.value.as_str() {
                Some(v) => Some(v.to_string()),
                // Lone surrogate escapes have no UTF-8 form
                None => {
                    lossy = true;
                    tracing::debug!(
                        target: "flight_parser::chunks",
                        "Chunk holds lone surrogates, replacing them with U+FFFD"
                    );
                    Some(s.value.to_string_lossy().into_owned())
                }
            },
            _ => None,
        },
        _ => None,
    };

    Some(PushEntry {
        tag,
        payload,
        lossy,
    })
}
