use leptos::prelude::*;
use pukpuk_shared::{BreadcrumbTarget, ROOT_LABEL, TrailItem};

use crate::app::Nav;
use crate::colors::{ACCENT, PANEL_BG, PANEL_BORDER, TEXT_MUTED, TEXT_STRONG};

const SEPARATOR: &str = "\u{203A}";

fn crumb_button_style() -> String {
    format!(
        "background: none; border: none; padding: 2px 4px; cursor: pointer; color: {ACCENT}; font-size: 0.8rem; font-weight: 600;"
    )
}

/// Home, each ancestor, then the current region. Ancestors are clickable.
#[component]
pub fn Breadcrumb() -> impl IntoView {
    let Nav(nav) = expect_context();
    let trail = Memo::new(move |_| nav.with(|n| n.trail()));

    let go = move |target: BreadcrumbTarget| {
        nav.update(|n| {
            let _ = n.drill_out(target);
        });
    };

    view! {
        <nav
            style=format!("position: absolute; top: 12px; left: 12px; z-index: 10; display: flex; align-items: center; gap: 4px; padding: 6px 8px; background: {PANEL_BG}; border: 1px solid {PANEL_BORDER}; border-radius: 8px; box-shadow: 0 2px 8px rgba(15,23,42,0.08);")
        >
            {move || {
                let at_root = trail.with(|t| t.len() == 1);
                trail
                    .get()
                    .into_iter()
                    .map(|item| match item {
                        TrailItem::Home => {
                            if at_root {
                                view! {
                                    <span style=format!("padding: 2px 4px; font-size: 0.8rem; font-weight: 700; color: {TEXT_STRONG};")>
                                        {ROOT_LABEL}
                                    </span>
                                }
                                    .into_any()
                            } else {
                                view! {
                                    <button style=crumb_button_style() on:click=move |_| go(BreadcrumbTarget::Home)>
                                        {ROOT_LABEL}
                                    </button>
                                }
                                    .into_any()
                            }
                        }
                        TrailItem::Crumb { index, name } => view! {
                            <span style=format!("color: {TEXT_MUTED};")>{SEPARATOR}</span>
                            <button style=crumb_button_style() on:click=move |_| go(BreadcrumbTarget::Crumb(index))>
                                {name}
                            </button>
                        }
                            .into_any(),
                        TrailItem::Current { name } => view! {
                            <span style=format!("color: {TEXT_MUTED};")>{SEPARATOR}</span>
                            <span style=format!("padding: 2px 4px; font-size: 0.8rem; font-weight: 700; color: {TEXT_STRONG};")>
                                {name}
                            </span>
                        }
                            .into_any(),
                    })
                    .collect::<Vec<_>>()
            }}
        </nav>
    }
}
