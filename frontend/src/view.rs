use planner::{
    sidebar::{percent, Notification},
    stats::RouteSummary,
    RouteStore, SelectionMode, Theme,
};
use seed::{prelude::*, virtual_dom::AtValue, *};
use shared::{api::FeedbackKind, Coordinate, QualityLabel};
use wasm_bindgen::JsCast;

use crate::{Model, Msg};

pub fn view(model: &Model) -> Node<Msg> {
    div![
        C!["shell", IF!(model.theme == Theme::Dark => "dark")],
        view_header(model),
        IF!(model.sidebar_open => view_sidebar(model)),
        view_notifications(model.notifications.iter()),
    ]
}

fn view_header(model: &Model) -> Node<Msg> {
    let health = match &model.health {
        None => span![C!["health"], "Checking service…"],
        Some(Ok(status)) => span![C!["health", "health-ok"], format!("Service: {status}")],
        Some(Err(_)) => span![C!["health", "health-down"], "Service unreachable"],
    };

    header![
        C!["header"],
        div![
            button![
                "☰",
                attrs! { At::Title => "Toggle sidebar" },
                ev(Ev::Click, |_| Msg::ToggleSidebar),
            ],
            h1!["SmartRoute AI"],
            small!["Road Health-Aware Routing"],
        ],
        div![
            health,
            button![
                match model.theme {
                    Theme::Light => "🌙",
                    Theme::Dark => "☀️",
                },
                attrs! { At::Title => "Toggle theme" },
                ev(Ev::Click, |_| Msg::ToggleTheme),
            ],
        ],
    ]
}

fn view_sidebar(model: &Model) -> Node<Msg> {
    aside![
        C!["sidebar"],
        view_route_planning(&model.store),
        view_road_analysis(model),
        model.store.summary().map_or_else(|| empty![], |summary| view_summary(&model.store, summary)),
        view_rl_panel(model),
        view_monitoring(model),
    ]
}

fn view_route_planning(store: &RouteStore) -> Node<Msg> {
    let loading = store.is_loading();
    let mode_button = |label: &str, mode: SelectionMode| {
        button![
            C![IF!(store.selection_mode() == mode => "active")],
            label,
            attrs! { At::Disabled => bool_attr(loading) },
            ev(Ev::Click, move |_| Msg::SetSelectionMode(mode)),
        ]
    };

    section![
        C!["card"],
        h2!["Route Planning"],
        div![
            C!["button-row"],
            mode_button("+ Start", SelectionMode::PickingStart),
            mode_button("+ End", SelectionMode::PickingEnd),
        ],
        store
            .start()
            .map_or_else(|| empty![], |coord| view_endpoint("endpoint-start", "Start Location", coord)),
        store
            .end()
            .map_or_else(|| empty![], |coord| view_endpoint("endpoint-end", "Destination", coord)),
        div![
            C!["button-row"],
            button![
                if loading { "Generating..." } else { "Generate Route" },
                attrs! { At::Disabled => bool_attr(loading) },
                ev(Ev::Click, |_| Msg::GenerateRoute),
            ],
            button![
                "✕",
                attrs! { At::Title => "Reset route", At::Disabled => bool_attr(loading) },
                ev(Ev::Click, |_| Msg::ResetRoute),
            ],
        ],
        IF!(loading => p![small!["Calculating route following real roads..."]]),
    ]
}

fn view_endpoint(class: &str, label: &str, coord: Coordinate) -> Node<Msg> {
    div![
        C![class],
        p![strong![label]],
        p![small![format_coordinate(coord)]],
    ]
}

fn view_road_analysis(model: &Model) -> Node<Msg> {
    let busy = model.uploads.is_busy();
    section![
        C!["card"],
        h2!["Road Analysis"],
        label![
            "Upload road images for AI analysis",
            input![
                attrs! {
                    At::Type => "file",
                    At::Accept => "image/*",
                    At::Multiple => AtValue::None,
                    At::Disabled => bool_attr(busy),
                },
                ev(Ev::Change, |event| {
                    let input = event.target()?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
                    let list = input.files()?;
                    let files = (0..list.length()).filter_map(|i| list.get(i)).collect();
                    input.set_value("");
                    Some(Msg::FilesChosen(files))
                }),
            ],
        ],
        IF!(busy => p![small![format!("Uploading... ({} queued)", model.uploads.remaining())]]),
        IF!(model.uploaded > 0 => p![format!("Uploaded: {} image(s)", model.uploaded)]),
        model.evidence.map_or_else(
            || empty![],
            |(cell, count)| p![small![format!("Cell {cell} now has {count} evidence image(s)")]],
        ),
        div![model.store.road_conditions().iter().map(|label| view_badge(*label))],
    ]
}

fn view_badge(label: QualityLabel) -> Node<Msg> {
    span![
        C!["badge"],
        style! { St::Background => planner::scene::condition_color(label) },
        label.as_str(),
    ]
}

fn view_summary(store: &RouteStore, summary: &RouteSummary) -> Node<Msg> {
    let bar = |name: &str, value: u8| {
        div![
            p![small![format!("{name}: {value}%")]],
            div![C!["bar"], div![style! { St::Width => format!("{value}%") }]],
        ]
    };

    section![
        C!["card"],
        h2!["Route Summary"],
        p![format!("Distance: {} km", summary.distance_label())],
        p![format!("Duration: {}", summary.duration_label())],
        store
            .route_origin()
            .map_or_else(|| empty![], |origin| p![small![format!("Source: {}", origin.as_str())]]),
        h2!["Road Quality Score"],
        div![C!["bar"], div![style! { St::Width => format!("{}%", summary.quality_score) }]],
        p![small![format!("{}/100 - {}", summary.quality_score, summary.rating().as_str())]],
        h2!["Condition Breakdown"],
        bar("Good", summary.conditions.good),
        bar("Moderate", summary.conditions.moderate),
        bar("Poor", summary.conditions.poor),
    ]
}

fn view_rl_panel(model: &Model) -> Node<Msg> {
    let disabled = !model.rl.can_send_feedback();
    let result = model.rl.route().map_or_else(
        || empty![],
        |route| {
            div![
                p![format!("Green coverage: {}", percent(route.green_percentage))],
                p![format!("Reward: {:.2}", route.reward)],
                IF!(!route.explanation.is_empty() => p![small![&route.explanation]]),
            ]
        },
    );

    section![
        C!["card"],
        h2!["RL Route"],
        button![
            if model.rl.is_loading() { "Asking agent..." } else { "Get RL Route" },
            attrs! { At::Disabled => bool_attr(model.rl.is_loading()) },
            ev(Ev::Click, |_| Msg::RequestRlRoute),
        ],
        result,
        textarea![
            attrs! {
                At::Placeholder => "Optional notes",
                At::Value => model.feedback_notes.as_str(),
                At::Disabled => bool_attr(disabled),
            },
            input_ev(Ev::Input, Msg::FeedbackNotesChanged),
        ],
        div![
            C!["button-row"],
            button![
                "👍 Good route",
                attrs! { At::Disabled => bool_attr(disabled) },
                ev(Ev::Click, |_| Msg::SendFeedback(FeedbackKind::Positive)),
            ],
            button![
                "👎 Bad route",
                attrs! { At::Disabled => bool_attr(disabled) },
                ev(Ev::Click, |_| Msg::SendFeedback(FeedbackKind::Negative)),
            ],
        ],
    ]
}

fn view_monitoring(model: &Model) -> Node<Msg> {
    let agent = match model.monitor.agent {
        Some(stats) => div![
            p![format!("Avg green coverage: {}", percent(stats.avg_green_percentage))],
            p![format!("Avg reward: {:.2}", stats.avg_reward)],
        ],
        None => p![small!["Agent stats unavailable"]],
    };
    let feedback = match model.monitor.feedback {
        Some(stats) => div![
            p![format!(
                "Feedback: {} positive, {} negative ({} total)",
                stats.positive, stats.negative, stats.total
            )],
            stats
                .avg_feedback
                .map_or_else(|| empty![], |avg| p![small![format!("Average score: {avg:.2}")]]),
        ],
        None => p![small!["Feedback stats unavailable"]],
    };

    section![C!["card"], h2!["Monitoring"], agent, feedback]
}

fn view_notifications<'a>(notifications: impl Iterator<Item = &'a Notification>) -> Node<Msg> {
    div![
        C!["toasts"],
        notifications.map(|notification| {
            let id = notification.id;
            div![
                C!["toast", notification.level.css_class()],
                strong![&notification.title],
                IF!(!notification.body.is_empty() => p![&notification.body]),
                ev(Ev::Click, move |_| Msg::DismissNotification(id)),
            ]
        }),
    ]
}

fn format_coordinate(coord: Coordinate) -> String {
    format!("{:.5}, {:.5}", coord.lat, coord.lon)
}

fn bool_attr(value: bool) -> AtValue {
    if value {
        AtValue::Some("true".into())
    } else {
        AtValue::Ignored
    }
}
