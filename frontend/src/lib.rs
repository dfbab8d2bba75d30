use std::{rc::Rc, time::Duration};

use chrono::{FixedOffset, Offset, Utc};
use planner::{
    client::build_http_client,
    hover::DwellTicket,
    scene::{self, MapCommand},
    sidebar::{
        parse_cell_answer, poll_monitor, upload_summary, Level, MonitorSnapshot, MonitorUpdate,
        NotificationCenter, RlPanel, UploadQueue, DEFAULT_CELL_ANSWER,
    },
    telemetry, FallbackChain, HoverTracker, ImageUpload, MapRenderer, PlannerConfig, PlannerError,
    RouteCandidate, RouteStore, RouteTicket, SelectionMode, SmartRouteClient, Theme,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use seed::{prelude::*, *};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    api::{FeedbackKind, FeedbackRequest, RlRouteResponse, UploadResponse},
    CellId, Coordinate, GridData,
};
use tracing::{debug, error, info, warn};
use wasm_bindgen::{
    prelude::{wasm_bindgen, JsValue},
    JsCast,
};

mod console;
mod view;

pub use view::view;

const TOAST_LIFETIME_MS: u32 = 5_000;

#[wasm_bindgen(module = "/leaflet_map.js")]
extern "C" {
    #[wasm_bindgen(js_name = initMap)]
    fn init_map(lat: f64, lng: f64, zoom: u8);
    #[wasm_bindgen(js_name = applyMapCommand)]
    fn apply_map_command(command: JsValue);
    #[wasm_bindgen(js_name = showTooltip)]
    fn show_tooltip(html: &str, x: f64, y: f64);
    #[wasm_bindgen(js_name = hideTooltip)]
    fn hide_tooltip();
    #[wasm_bindgen(js_name = setSelectionHint)]
    fn set_selection_hint(text: Option<String>);
}

pub struct Model {
    config: PlannerConfig,
    client: SmartRouteClient,
    chain: Rc<FallbackChain>,
    store: RouteStore,
    renderer: MapRenderer,
    drawn_selection: Option<SelectionMode>,
    hover: HoverTracker,
    dwell_timer: Option<CmdHandle>,
    theme: Theme,
    sidebar_open: bool,
    health: Option<Result<String, String>>,
    uploads: UploadQueue<web_sys::File>,
    uploaded: usize,
    evidence: Option<(CellId, usize)>,
    rl: RlPanel,
    feedback_notes: String,
    monitor: MonitorSnapshot,
    _monitor_poll: StreamHandle,
    notifications: NotificationCenter,
    rng: ChaCha8Rng,
    local_offset: FixedOffset,
}

pub enum Msg {
    MapClicked(Coordinate),
    CellHovered { cell: CellId, x: f64, y: f64 },
    GridLeft,
    DwellElapsed(DwellTicket),
    SetSelectionMode(SelectionMode),
    GenerateRoute,
    RouteResolved(RouteTicket, RouteCandidate),
    ResetRoute,
    GridLoaded(Result<GridData, PlannerError>),
    HealthChecked(Result<String, String>),
    FilesChosen(Vec<web_sys::File>),
    UploadNext,
    FileRead(Result<ImageUpload, String>),
    UploadFinished(CellId, Result<UploadResponse, String>),
    EvidenceCounted(CellId, Result<usize, String>),
    RequestRlRoute,
    RlRouteFetched(Result<RlRouteResponse, String>),
    FeedbackNotesChanged(String),
    SendFeedback(FeedbackKind),
    FeedbackSent(Result<Option<String>, String>),
    MonitorTick,
    MonitorPolled(MonitorUpdate),
    ToggleTheme,
    ToggleSidebar,
    DismissNotification(u64),
}

pub fn init(_: Url, orders: &mut impl Orders<Msg>) -> Model {
    let config = PlannerConfig::from_build_env();
    telemetry::init_tracing(&config.log_directives, console::ConsoleMakeWriter);

    let http = build_http_client(&config).unwrap_or_else(|err| {
        error!("failed to configure HTTP client: {err}");
        reqwest::Client::new()
    });
    let client = SmartRouteClient::new(config.api_root.clone(), http.clone());
    let chain = FallbackChain::with_http(&config, http);
    info!(api = client.root(), sources = ?chain.source_names(), "SmartRoute client ready");

    orders
        .stream(streams::window_event(Ev::from("map-click"), |event| {
            let payload: MapClickPayload = event_detail(event)?;
            Some(Msg::MapClicked(Coordinate::new(payload.lat, payload.lon)))
        }))
        .stream(streams::window_event(Ev::from("cell-hover"), |event| {
            let payload: CellHoverPayload = event_detail(event)?;
            Some(Msg::CellHovered {
                cell: CellId {
                    row: payload.row,
                    col: payload.col,
                },
                x: payload.x,
                y: payload.y,
            })
        }))
        .stream(streams::window_event(Ev::from("grid-leave"), |_| Msg::GridLeft));

    let poll_ms = u32::try_from(config.monitor_interval.as_millis()).unwrap_or(u32::MAX);
    let monitor_poll = orders.stream_with_handle(streams::interval(poll_ms, || Msg::MonitorTick));
    orders.send_msg(Msg::MonitorTick);

    let grid_client = client.clone();
    orders.perform_cmd(async move { Msg::GridLoaded(grid_client.fetch_grid().await) });
    let health_client = client.clone();
    orders.perform_cmd(async move {
        let status = health_client
            .health()
            .await
            .map(|health| health.status)
            .map_err(|err| err.to_string());
        Msg::HealthChecked(status)
    });

    let mut model = Model {
        hover: HoverTracker::new(config.hover_dwell),
        config,
        client,
        chain: Rc::new(chain),
        store: RouteStore::new(),
        renderer: MapRenderer::new(),
        drawn_selection: None,
        dwell_timer: None,
        theme: Theme::default(),
        sidebar_open: true,
        health: None,
        uploads: UploadQueue::new(),
        uploaded: 0,
        evidence: None,
        rl: RlPanel::default(),
        feedback_notes: String::new(),
        monitor: MonitorSnapshot::default(),
        _monitor_poll: monitor_poll,
        notifications: NotificationCenter::default(),
        rng: ChaCha8Rng::seed_from_u64(js_sys::Date::now().to_bits()),
        local_offset: local_offset(),
    };
    sync_map(&mut model);
    model
}

pub fn update(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    handle(msg, model, orders);
    sync_map(model);
}

fn handle(msg: Msg, model: &mut Model, orders: &mut impl Orders<Msg>) {
    match msg {
        Msg::MapClicked(coord) => model.store.handle_map_click(coord),
        Msg::SetSelectionMode(mode) => model.store.set_selection_mode(mode),
        Msg::GenerateRoute => {
            if model.store.is_loading() {
                return;
            }
            let Some(ticket) = model.store.begin_route() else {
                missing_locations(model, orders);
                return;
            };
            let chain = Rc::clone(&model.chain);
            let mut rng = ChaCha8Rng::seed_from_u64(model.rng.gen());
            orders.perform_cmd(async move {
                let candidate = chain.resolve(ticket.start, ticket.end, &mut rng).await;
                Msg::RouteResolved(ticket, candidate)
            });
        }
        Msg::RouteResolved(ticket, candidate) => {
            let origin = candidate.origin;
            if model.store.complete_route(ticket, candidate, &mut model.rng) {
                let detail = model
                    .store
                    .summary()
                    .map(|summary| {
                        format!(
                            "{} km, {} via {}",
                            summary.distance_label(),
                            summary.duration_label(),
                            origin.as_str()
                        )
                    })
                    .unwrap_or_default();
                notify(model, orders, Level::Success, "Route Generated", detail);
            }
        }
        Msg::ResetRoute => model.store.reset(),
        Msg::GridLoaded(result) => model.store.apply_grid(result),
        Msg::HealthChecked(result) => {
            if let Err(err) = &result {
                warn!("health check failed: {err}");
            }
            model.health = Some(result);
        }
        Msg::CellHovered { cell, x, y } => {
            orders.skip();
            let change = model.hover.pointer_moved(cell, x, y, now());
            if change.hide_tooltip {
                hide_tooltip();
            }
            if let Some(ticket) = change.schedule {
                let delay = u32::try_from(ticket.delay.as_millis()).unwrap_or(u32::MAX);
                model.dwell_timer = Some(
                    orders.perform_cmd_with_handle(cmds::timeout(delay, move || Msg::DwellElapsed(ticket))),
                );
            }
        }
        Msg::GridLeft => {
            orders.skip();
            model.dwell_timer = None;
            if model.hover.cancel() {
                hide_tooltip();
            }
        }
        Msg::DwellElapsed(ticket) => {
            orders.skip();
            let Some(tooltip) = model.hover.fire(ticket, now()) else {
                return;
            };
            if let Some(html) = scene::tooltip_html(model.store.grid(), tooltip.cell, model.local_offset) {
                show_tooltip(&html, tooltip.x, tooltip.y);
            }
        }
        Msg::FilesChosen(files) => {
            debug!(count = files.len(), "images selected");
            model.uploads.enqueue(files);
            orders.send_msg(Msg::UploadNext);
        }
        Msg::UploadNext => {
            if let Some(file) = model.uploads.start_next() {
                orders.perform_cmd(read_file(file));
            }
        }
        Msg::FileRead(Err(err)) => {
            notify(model, orders, Level::Error, "Upload Failed", err);
            next_upload(model, orders);
        }
        Msg::FileRead(Ok(image)) => {
            let answer = prompt_cell(&image.file_name);
            match parse_cell_answer(answer.as_deref()) {
                Ok(Some(cell)) => {
                    let client = model.client.clone();
                    orders.perform_cmd(async move {
                        let result = client.upload_image(image, cell).await.map_err(|err| err.to_string());
                        Msg::UploadFinished(cell, result)
                    });
                }
                Ok(None) => {
                    debug!(file = %image.file_name, "cell prompt cancelled, skipping");
                    next_upload(model, orders);
                }
                Err(err) => {
                    notify(model, orders, Level::Error, "Invalid Cell", err.to_string());
                    next_upload(model, orders);
                }
            }
        }
        Msg::UploadFinished(cell, result) => {
            match result {
                Ok(response) => {
                    model.uploaded += 1;
                    if let Some(label) = response.prediction {
                        model.store.add_road_condition(label);
                    }
                    notify(
                        model,
                        orders,
                        Level::Success,
                        format!("Image Analyzed for cell {cell}"),
                        upload_summary(&response),
                    );
                    let client = model.client.clone();
                    orders.perform_cmd(async move {
                        let count = client
                            .cell_evidence(cell)
                            .await
                            .map(|entries| entries.len())
                            .map_err(|err| err.to_string());
                        Msg::EvidenceCounted(cell, count)
                    });
                }
                Err(err) => notify(model, orders, Level::Error, "Upload Failed", err),
            }
            next_upload(model, orders);
        }
        Msg::EvidenceCounted(cell, result) => match result {
            Ok(count) => model.evidence = Some((cell, count)),
            Err(err) => debug!(%cell, "evidence lookup failed: {err}"),
        },
        Msg::RequestRlRoute => {
            let (Some(start), Some(end)) = (model.store.start(), model.store.end()) else {
                missing_locations(model, orders);
                return;
            };
            if model.rl.begin_request() {
                let client = model.client.clone();
                orders.perform_cmd(async move {
                    Msg::RlRouteFetched(client.fetch_rl_route(start, end).await.map_err(|err| err.to_string()))
                });
            }
        }
        Msg::RlRouteFetched(result) => {
            model.rl.apply(&result);
            if let Err(err) = result {
                notify(model, orders, Level::Error, "RL Route Failed", err);
            }
        }
        Msg::FeedbackNotesChanged(notes) => model.feedback_notes = notes,
        Msg::SendFeedback(kind) => {
            if let Some(request) = model.rl.feedback_request(kind, &model.feedback_notes) {
                orders.perform_cmd(send_feedback(model.client.clone(), request));
            }
        }
        Msg::FeedbackSent(result) => {
            model.rl.feedback_done();
            match result {
                Ok(message) => {
                    model.feedback_notes.clear();
                    let body = message.unwrap_or_else(|| "Thanks for helping the agent learn.".to_string());
                    notify(model, orders, Level::Success, "Feedback Sent", body);
                }
                Err(err) => notify(model, orders, Level::Error, "Feedback Failed", err),
            }
        }
        Msg::MonitorTick => {
            orders.skip();
            let client = model.client.clone();
            orders.perform_cmd(async move { Msg::MonitorPolled(poll_monitor(&client).await) });
        }
        Msg::MonitorPolled(update) => model.monitor.merge(update),
        Msg::ToggleTheme => model.theme = model.theme.toggled(),
        Msg::ToggleSidebar => model.sidebar_open = !model.sidebar_open,
        Msg::DismissNotification(id) => model.notifications.dismiss(id),
    }
}

fn sync_map(model: &mut Model) {
    let commands = model
        .renderer
        .render(&model.store, model.theme, &model.config, model.local_offset);
    for command in &commands {
        push_command(command);
    }

    let selection = model.store.selection_mode();
    if model.drawn_selection != Some(selection) {
        model.drawn_selection = Some(selection);
        set_selection_hint(scene::selection_hint(selection).map(str::to_string));
    }
}

fn push_command(command: &MapCommand) {
    match serde_wasm_bindgen::to_value(command) {
        Ok(value) => apply_map_command(value),
        Err(err) => error!("failed to encode map command: {err}"),
    }
}

fn notify(
    model: &mut Model,
    orders: &mut impl Orders<Msg>,
    level: Level,
    title: impl Into<String>,
    body: impl Into<String>,
) {
    let id = model.notifications.push(level, title, body);
    orders.perform_cmd(cmds::timeout(TOAST_LIFETIME_MS, move || Msg::DismissNotification(id)));
}

fn missing_locations(model: &mut Model, orders: &mut impl Orders<Msg>) {
    notify(
        model,
        orders,
        Level::Error,
        "Missing Locations",
        "Please select both start and destination points first.",
    );
}

fn next_upload(model: &mut Model, orders: &mut impl Orders<Msg>) {
    model.uploads.finish();
    orders.send_msg(Msg::UploadNext);
}

async fn read_file(file: web_sys::File) -> Msg {
    let buffer = wasm_bindgen_futures::JsFuture::from(file.array_buffer()).await;
    let result = buffer
        .map(|buffer| ImageUpload {
            file_name: file.name(),
            mime_type: mime_or_default(file.type_()),
            bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
        })
        .map_err(|err| format!("could not read {}: {err:?}", file.name()));
    Msg::FileRead(result)
}

async fn send_feedback(client: SmartRouteClient, request: FeedbackRequest) -> Msg {
    let result = client
        .send_feedback(&request)
        .await
        .map(|ack| ack.message)
        .map_err(|err| err.to_string());
    Msg::FeedbackSent(result)
}

fn prompt_cell(file_name: &str) -> Option<String> {
    let message = format!("Grid cell for {file_name} (row,col):");
    web_sys::window()?
        .prompt_with_message_and_default(&message, DEFAULT_CELL_ANSWER)
        .ok()
        .flatten()
}

fn mime_or_default(mime: String) -> String {
    if mime.trim().is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime
    }
}

fn now() -> Duration {
    let millis = web_sys::window()
        .and_then(|window| window.performance())
        .map_or(0.0, |performance| performance.now());
    Duration::from_secs_f64(millis.max(0.0) / 1000.0)
}

/// Browser time zone as a fixed offset; UTC when unknown.
fn local_offset() -> FixedOffset {
    let minutes_behind_utc = js_sys::Date::new_0().get_timezone_offset();
    offset_from_js_minutes(minutes_behind_utc)
}

fn offset_from_js_minutes(minutes_behind_utc: f64) -> FixedOffset {
    FixedOffset::west_opt((minutes_behind_utc * 60.0).round() as i32).unwrap_or_else(|| Utc.fix())
}

fn event_detail<T: DeserializeOwned>(event: web_sys::Event) -> Option<T> {
    let event = event.dyn_into::<web_sys::CustomEvent>().ok()?;
    serde_wasm_bindgen::from_value(event.detail()).ok()
}

#[derive(Deserialize)]
struct MapClickPayload {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct CellHoverPayload {
    row: u32,
    col: u32,
    x: f64,
    y: f64,
}

#[wasm_bindgen(start)]
pub fn start() {
    let config = PlannerConfig::from_build_env();
    init_map(config.initial_center.lat, config.initial_center.lon, config.initial_zoom);
    App::start("app", init, update, view);
}
