use leptos::prelude::*;
use pukpuk_shared::{
    DataLayer, LEGEND, LoadError, NEUTRAL_FILL, PLACEHOLDER_FILLS, RegionIdentity, RegionLevel,
    RegionalInsight, Risk, Trend, ViewMode, content_for, is_root_code, legend_title,
};

use crate::app::{
    CurrentRegion, DatasetError, DatasetLoading, ForecastWeek, Hovered, Layer, MappingFailed,
    MappingSignal, Mode, MousePos, Nav, Notice, Overlay, OverlayError, ReloadNonce,
    apply_click_plan,
};
use crate::click::plan_click;
use crate::colors::{ACCENT, PANEL_BG, PANEL_BORDER, TEXT_MUTED, TEXT_STRONG, with_alpha};

pub(crate) const MAX_FORECAST_WEEK: u32 = 12;

const CARD_STYLE: &str = "background: #FFFFFF; border: 1px solid #E2E8F0; border-radius: 10px; box-shadow: 0 1px 3px rgba(15,23,42,0.06);";

fn floating_panel_style(position: &str) -> String {
    format!(
        "position: absolute; {position} z-index: 10; background: {PANEL_BG}; border: 1px solid {PANEL_BORDER}; border-radius: 8px; box-shadow: 0 2px 8px rgba(15,23,42,0.08); padding: 10px 12px; font-size: 0.75rem; color: {TEXT_STRONG};"
    )
}

pub(crate) fn level_id_label(code: &str) -> String {
    if is_root_code(code) {
        "National View".to_string()
    } else {
        format!("ID: {code}")
    }
}

pub(crate) fn week_label(week: u32) -> String {
    format!("Week {}", week + 1)
}

/// Insight cards open the region they describe, except when the current view
/// already lists districts.
pub(crate) fn insights_clickable(level: RegionLevel) -> bool {
    matches!(level, RegionLevel::National | RegionLevel::Province)
}

pub(crate) fn load_error_message(error: &LoadError) -> String {
    match error {
        LoadError::NotFound { .. } => "Peta detail belum tersedia untuk wilayah ini".to_string(),
        LoadError::Timeout => "Memuat peta terlalu lama".to_string(),
        LoadError::Http(status) => format!("Gagal memuat peta (HTTP {status})"),
        LoadError::Network(_) | LoadError::Parse(_) => format!("Gagal memuat peta: {error}"),
    }
}

fn risk_colors(risk: Risk) -> (&'static str, &'static str) {
    match risk {
        Risk::High => ("#FEE2E2", "#B91C1C"),
        Risk::Medium => ("#FEF3C7", "#B45309"),
        Risk::Low => ("#F1F5F9", "#475569"),
    }
}

fn trend_marker(trend: Trend) -> (&'static str, &'static str) {
    match trend {
        Trend::Up => ("\u{25B2}", "#10B981"),
        Trend::Down => ("\u{25BC}", "#EF4444"),
        Trend::Stable => ("\u{25AC}", TEXT_MUTED),
    }
}

/// Mode, layer and region currently displayed.
#[component]
pub fn ActiveViewPanel() -> impl IntoView {
    let Nav(nav) = expect_context();
    let Mode(mode) = expect_context();
    let Layer(layer) = expect_context();

    view! {
        <div style=floating_panel_style("top: 12px; right: 12px; min-width: 200px;")>
            <div style="display: flex; justify-content: space-between; align-items: center; gap: 12px; padding-bottom: 6px; margin-bottom: 6px; border-bottom: 1px solid #E2E8F0;">
                <span style=format!("text-transform: uppercase; letter-spacing: 0.06em; font-weight: 700; color: {TEXT_MUTED}; font-size: 0.65rem;")>
                    "Active View"
                </span>
                <span style=move || {
                    let live = mode.get() == ViewMode::Live;
                    format!(
                        "font-size: 0.62rem; padding: 1px 6px; border-radius: 999px; border: 1px solid {ACCENT}; color: {}; background: {};",
                        if live { ACCENT } else { "#FFFFFF" },
                        if live { "transparent" } else { ACCENT },
                    )
                }>
                    {move || if mode.get() == ViewMode::Live { "Live Data" } else { "AI Forecast" }}
                </span>
            </div>
            <div style="display: flex; justify-content: space-between; gap: 12px;">
                <span style=format!("color: {TEXT_MUTED};")>"Region"</span>
                <span style="font-weight: 800; text-transform: uppercase; max-width: 140px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;">
                    {move || nav.with(|n| n.state().region_name.clone())}
                </span>
            </div>
            <div style="display: flex; justify-content: space-between; gap: 12px; margin-top: 4px;">
                <span style=format!("color: {TEXT_MUTED};")>"Layer"</span>
                <span style="font-weight: 700;">{move || layer.get().label()}</span>
            </div>
        </div>
    }
}

/// Severity colours for the current mode.
#[component]
pub fn Legend() -> impl IntoView {
    let Mode(mode) = expect_context();

    let swatch = |color: &str| {
        format!(
            "display: inline-block; width: 12px; height: 12px; border-radius: 3px; background: {};",
            with_alpha(color, 0.85)
        )
    };

    view! {
        <div style=floating_panel_style("bottom: 12px; left: 12px;")>
            <div style="font-weight: 700; margin-bottom: 6px;">{move || legend_title(mode.get())}</div>
            {LEGEND
                .iter()
                .map(|entry| {
                    view! {
                        <div style="display: flex; align-items: center; gap: 6px; margin-top: 3px;">
                            <span style=swatch(entry.status.color()) />
                            <span>{entry.label}</span>
                        </div>
                    }
                })
                .collect::<Vec<_>>()}
            <div style="display: flex; align-items: center; gap: 6px; margin-top: 3px;">
                <span style=swatch(PLACEHOLDER_FILLS[0]) />
                <span style=format!("color: {TEXT_MUTED};")>"Belum ada data"</span>
            </div>
        </div>
    }
}

/// Failures that leave the previous map on screen, with a retry.
#[component]
pub fn StatusBadges() -> impl IntoView {
    let DatasetError(dataset_error) = expect_context();
    let MappingFailed(mapping_failed) = expect_context();
    let OverlayError(overlay_error) = expect_context();
    let ReloadNonce(reload_nonce) = expect_context();
    let Nav(nav) = expect_context();

    let badge_style = "display: flex; align-items: center; gap: 8px; padding: 6px 10px; border-radius: 8px; background: #FEF2F2; border: 1px solid #FECACA; color: #991B1B; font-size: 0.72rem;";
    let action_style = "background: #FFFFFF; border: 1px solid #FECACA; border-radius: 6px; padding: 2px 8px; cursor: pointer; color: #991B1B; font-size: 0.7rem;";

    view! {
        <div style="position: absolute; bottom: 12px; right: 12px; z-index: 11; display: flex; flex-direction: column; gap: 6px; align-items: flex-end;">
            {move || {
                mapping_failed
                    .get()
                    .map(|e| {
                        view! {
                            <div style=badge_style>
                                <span>{format!("Referensi wilayah gagal dimuat: {e}")}</span>
                                <button style=action_style on:click=move |_| reload_nonce.update(|n| *n = n.wrapping_add(1))>
                                    "Coba lagi"
                                </button>
                            </div>
                        }
                    })
            }}
            {move || {
                dataset_error
                    .get()
                    .map(|e| {
                        let not_found = matches!(e, LoadError::NotFound { .. });
                        view! {
                            <div style=badge_style>
                                <span>{load_error_message(&e)}</span>
                                {if not_found {
                                    view! {
                                        <button
                                            style=action_style
                                            on:click=move |_| nav.update(|n| {
                                                let _ = n.go_home();
                                            })
                                        >
                                            "Kembali ke Indonesia"
                                        </button>
                                    }
                                        .into_any()
                                } else {
                                    view! {
                                        <button style=action_style on:click=move |_| reload_nonce.update(|n| *n = n.wrapping_add(1))>
                                            "Coba lagi"
                                        </button>
                                    }
                                        .into_any()
                                }}
                            </div>
                        }
                    })
            }}
            {move || {
                overlay_error
                    .get()
                    .map(|e| {
                        view! {
                            <div style=badge_style title=e>
                                "Data analitik tidak tersedia"
                            </div>
                        }
                    })
            }}
        </div>
    }
}

/// Covers the map while the latest dataset request is outstanding.
#[component]
pub fn LoadingVeil() -> impl IntoView {
    let DatasetLoading(loading) = expect_context();
    let MappingSignal(mapping) = expect_context();
    let MappingFailed(mapping_failed) = expect_context();

    let visible = move || {
        loading.get() || (mapping.with(Option::is_none) && mapping_failed.with(Option::is_none))
    };

    view! {
        <div
            style="position: absolute; inset: 0; z-index: 9; display: flex; align-items: center; justify-content: center; background: rgba(248,250,252,0.6); transition: opacity 0.15s;"
            style:opacity=move || if visible() { "1" } else { "0" }
            style:pointer-events=move || if visible() { "auto" } else { "none" }
        >
            <div style=format!("padding: 8px 14px; border-radius: 999px; background: #FFFFFF; border: 1px solid {PANEL_BORDER}; font-size: 0.8rem; color: {TEXT_STRONG}; box-shadow: 0 2px 8px rgba(15,23,42,0.08);")>
                "Memuat peta\u{2026}"
            </div>
        </div>
    }
}

/// Short-lived click feedback ("detail not available", district info).
#[component]
pub fn NoticeToast() -> impl IntoView {
    let notice: Notice = expect_context();

    view! {
        {move || {
            notice
                .0
                .get()
                .1
                .map(|message| {
                    view! {
                        <div
                            role="status"
                            style=format!("position: absolute; top: 60px; left: 50%; transform: translateX(-50%); z-index: 12; display: flex; align-items: center; gap: 10px; padding: 8px 12px; border-radius: 8px; background: {TEXT_STRONG}; color: #FFFFFF; font-size: 0.8rem; box-shadow: 0 4px 16px rgba(15,23,42,0.25);")
                        >
                            <span>{message}</span>
                            <button
                                style="background: none; border: none; color: #CBD5E1; cursor: pointer; font-size: 0.9rem; line-height: 1;"
                                on:click=move |_| notice.dismiss()
                            >
                                "\u{00D7}"
                            </button>
                        </div>
                    }
                })
        }}
    }
}

/// Mode, layer, level id and forecast period.
#[component]
pub fn Controls() -> impl IntoView {
    let Mode(mode) = expect_context();
    let Layer(layer) = expect_context();
    let ForecastWeek(forecast_week) = expect_context();
    let CurrentRegion(region) = expect_context();

    let mode_button = move |target: ViewMode| {
        view! {
            <button
                style=move || {
                    let active = mode.get() == target;
                    format!(
                        "flex: 1; padding: 6px 8px; border-radius: 6px; cursor: pointer; font-size: 0.8rem; border: 1px solid {ACCENT}; color: {}; background: {};",
                        if active { "#FFFFFF" } else { ACCENT },
                        if active { ACCENT } else { "#FFFFFF" },
                    )
                }
                on:click=move |_| mode.set(target)
            >
                {target.label()}
            </button>
        }
    };

    let label_style = format!("display: block; font-size: 0.75rem; font-weight: 600; color: {TEXT_STRONG}; margin-bottom: 6px;");
    let period_label_style = label_style.clone();

    view! {
        <section style=format!("{CARD_STYLE} padding: 14px; display: flex; flex-direction: column; gap: 16px; height: 100%; box-sizing: border-box;")>
            <div>
                <h2 style=format!("margin: 0; font-size: 1rem; color: {TEXT_STRONG};")>"Map Controls"</h2>
                <p style=format!("margin: 2px 0 0; font-size: 0.72rem; color: {TEXT_MUTED};")>
                    "Configure AI forecast parameters"
                </p>
            </div>
            <div>
                <span style=label_style.clone()>"Data Mode"</span>
                <div style="display: flex; gap: 8px;">
                    {ViewMode::ALL.into_iter().map(mode_button).collect::<Vec<_>>()}
                </div>
            </div>
            <div>
                <label style=label_style.clone()>"Data Layer"</label>
                <select
                    style=format!("width: 100%; padding: 6px; border-radius: 6px; border: 1px solid {PANEL_BORDER}; font-size: 0.8rem;")
                    on:change=move |ev| {
                        if let Some(next) = DataLayer::parse(&event_target_value(&ev)) {
                            layer.set(next);
                        }
                    }
                >
                    {DataLayer::ALL
                        .into_iter()
                        .map(|option| {
                            view! {
                                <option value=option.as_str() selected=move || layer.get() == option>
                                    {option.label()}
                                </option>
                            }
                        })
                        .collect::<Vec<_>>()}
                </select>
            </div>
            <div>
                <span style=label_style.clone()>"Current Level ID"</span>
                <div style=format!("padding: 6px; text-align: center; font-family: 'JetBrains Mono', monospace; font-size: 0.8rem; background: {NEUTRAL_FILL}; border-radius: 6px;")>
                    {move || level_id_label(&region.get().code)}
                </div>
            </div>
            {move || {
                (mode.get() == ViewMode::Forecast)
                    .then(|| {
                        view! {
                            <div>
                                <div style="display: flex; justify-content: space-between; align-items: center;">
                                    <span style=period_label_style.clone()>"Forecast Period"</span>
                                    <span style=format!("font-size: 0.72rem; color: {TEXT_MUTED};")>
                                        {move || week_label(forecast_week.get())}
                                    </span>
                                </div>
                                <input
                                    type="range"
                                    min="0"
                                    max=MAX_FORECAST_WEEK.to_string()
                                    step="1"
                                    style=format!("width: 100%; accent-color: {ACCENT};")
                                    prop:value=move || forecast_week.get().to_string()
                                    on:input=move |ev| {
                                        if let Ok(week) = event_target_value(&ev).parse::<u32>() {
                                            forecast_week.set(week.min(MAX_FORECAST_WEEK));
                                        }
                                    }
                                />
                            </div>
                        }
                    })
            }}
        </section>
    }
}

/// Per-region summaries returned with the overlay.
#[component]
pub fn RegionalInsights() -> impl IntoView {
    let Overlay(overlay) = expect_context();
    let MappingSignal(mapping) = expect_context();
    let CurrentRegion(region) = expect_context();
    let Nav(nav) = expect_context();
    let notice: Notice = expect_context();

    let open = move |insight: &RegionalInsight| {
        let Some(mapping) = mapping.get_untracked() else {
            return;
        };
        let identity = RegionIdentity {
            code: insight.code.clone(),
            data_key: insight.code.clone(),
            name: insight.name.clone(),
        };
        let plan = plan_click(region.get_untracked().level, &identity, &mapping);
        apply_click_plan(plan, nav, notice);
    };

    view! {
        <section style=format!("{CARD_STYLE} padding: 14px;")>
            <h2 style=format!("margin: 0; font-size: 1rem; color: {TEXT_STRONG};")>"Regional Insights"</h2>
            <p style=format!("margin: 2px 0 12px; font-size: 0.72rem; color: {TEXT_MUTED};")>
                "AI-detected anomalies in current view"
            </p>
            <div style="display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 12px;">
                {move || {
                    let clickable = insights_clickable(region.get().level);
                    let insights = overlay
                        .get()
                        .map(|resp| resp.regional_insights.clone())
                        .unwrap_or_default();
                    if insights.is_empty() {
                        return view! {
                            <p style=format!("margin: 0; font-size: 0.8rem; color: {TEXT_MUTED}; font-style: italic;")>
                                "Belum ada insight untuk wilayah ini"
                            </p>
                        }
                            .into_any();
                    }
                    insights
                        .into_iter()
                        .map(|insight| {
                            let (risk_bg, risk_fg) = risk_colors(insight.risk);
                            let (trend_icon, trend_color) = trend_marker(insight.trend);
                            let title = insight.display_name();
                            let demand = insight.demand.clone();
                            let confidence = format!("{}%", insight.confidence);
                            let risk_text = format!("{} risk", insight.risk.as_str());
                            view! {
                                <div
                                    style=format!(
                                        "{CARD_STYLE} padding: 12px; cursor: {};",
                                        if clickable { "pointer" } else { "default" },
                                    )
                                    on:click=move |_| {
                                        if clickable {
                                            open(&insight);
                                        }
                                    }
                                >
                                    <div style=format!("font-size: 0.8rem; font-weight: 600; color: {TEXT_STRONG}; margin-bottom: 8px;")>
                                        {title}
                                    </div>
                                    <div style=format!("font-size: 1.4rem; font-weight: 800; color: {ACCENT};")>
                                        {demand}
                                    </div>
                                    <div style=format!("font-size: 0.68rem; color: {TEXT_MUTED};")>"Forecasted demand"</div>
                                    <div style="display: flex; justify-content: space-between; font-size: 0.72rem; margin-top: 8px;">
                                        <span style=format!("color: {TEXT_MUTED};")>"Confidence:"</span>
                                        <span style="font-weight: 600;">{confidence}</span>
                                    </div>
                                    <div style="display: flex; align-items: center; gap: 6px; margin-top: 8px; font-size: 0.7rem;">
                                        <span style=format!("color: {trend_color};")>{trend_icon}</span>
                                        <span style=format!("padding: 1px 8px; border-radius: 999px; background: {risk_bg}; color: {risk_fg};")>
                                            {risk_text}
                                        </span>
                                    </div>
                                </div>
                            }
                        })
                        .collect::<Vec<_>>()
                        .into_any()
                }}
            </div>
        </section>
    }
}

/// Follows the pointer while a feature is hovered.
#[component]
pub fn Tooltip() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let Overlay(overlay) = expect_context();
    let MousePos(mouse_pos) = expect_context();

    let tooltip_info = Memo::new(move |_| {
        let (_, identity) = hovered.get()?;
        let key = identity.data_key.as_deref();
        overlay.with(|resp| {
            let analytics = resp.as_ref().map(|r| &r.map_analytics);
            let status = key
                .and_then(|k| analytics.and_then(|a| a.get(k)))
                .map(|entry| entry.status);
            Some((content_for(&identity.name, key, analytics), status))
        })
    });

    view! {
        {move || {
            let Some((content, status)) = tooltip_info.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = mouse_pos.get();
            let accent = status.map_or(PANEL_BORDER, |s| s.color());
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y + 16.0)
                    style=format!("position: fixed; pointer-events: none; z-index: 100; width: 220px; background: rgba(255,255,255,0.96); border: 1px solid {PANEL_BORDER}; border-left: 4px solid {accent}; border-radius: 0 8px 8px 0; box-shadow: 0 8px 24px rgba(15,23,42,0.18); padding: 10px 12px;")
                >
                    <div style=format!("font-size: 0.85rem; font-weight: 700; color: {TEXT_STRONG}; border-bottom: 1px solid #F1F5F9; padding-bottom: 4px; margin-bottom: 6px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap;")>
                        {content.title}
                    </div>
                    {match (content.value_text, content.status_label) {
                        (None, None) => view! {
                            <p style=format!("margin: 0; font-size: 0.72rem; color: {TEXT_MUTED}; font-style: italic;")>
                                "Data belum tersedia"
                            </p>
                        }
                            .into_any(),
                        (value, label) => view! {
                            {value.map(|v| view! {
                                <div style="display: flex; justify-content: space-between; align-items: baseline;">
                                    <span style=format!("font-size: 0.72rem; color: {TEXT_MUTED};")>"Demand:"</span>
                                    <span style=format!("font-size: 1rem; font-weight: 800; color: {TEXT_STRONG};")>{v}</span>
                                </div>
                            })}
                            {label.map(|l| view! {
                                <div style=format!("margin-top: 4px; width: fit-content; font-size: 0.65rem; font-weight: 700; text-transform: uppercase; letter-spacing: 0.05em; padding: 1px 8px; border-radius: 999px; color: {accent}; background: {};", with_alpha(accent, 0.12))>
                                    {format!("\u{25CF} {l}")}
                                </div>
                            })}
                        }
                            .into_any(),
                    }}
                </div>
            }
                .into_any()
        }}
    }
}
