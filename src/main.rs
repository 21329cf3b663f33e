//! Stagewalk entry point
//!
//! Wires the platform together: the WebSocket event channel feeds the
//! transport state machine, the transport handlers mutate the entity
//! registry, and a requestAnimationFrame loop ticks the simulation and paints
//! the stage onto a 2D canvas.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, CloseEvent, Document, HtmlCanvasElement, HtmlInputElement,
        MessageEvent, WebSocket,
    };

    use stagewalk::config::Config;
    use stagewalk::consts::*;
    use stagewalk::net::{ApiClient, CommandRequest, RetryPolicy};
    use stagewalk::sim::{EntityRegistry, Ticker};
    use stagewalk::transport::{EventKind, EventTransport};

    /// Everything the frame loop mutates.
    struct App {
        registry: EntityRegistry,
        ticker: Ticker,
    }

    type SharedApp = Rc<RefCell<App>>;
    type SharedTransport = Rc<RefCell<EventTransport>>;

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("stage")
            .expect("no stage canvas")
            .dyn_into()
            .expect("not a canvas");
        canvas.set_width(STAGE_WIDTH as u32);
        canvas.set_height(STAGE_HEIGHT as u32);
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .expect("get_context failed")
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");

        let config = Config::with_seed(js_sys::Date::now() as u64);
        log::info!("stage starting (seed {})", config.seed);

        let app = Rc::new(RefCell::new(App {
            registry: EntityRegistry::new(config.seed),
            ticker: Ticker::new(),
        }));
        let transport = Rc::new(RefCell::new(EventTransport::new()));

        register_event_handlers(&transport, &app, &document);
        connect_event_channel(config.ws_url.clone(), transport.clone());

        let api = Rc::new(ApiClient::new(
            config.api_base_url.clone(),
            config.request_timeout_ms,
            RetryPolicy {
                max_attempts: config.max_retries,
                base_delay_ms: config.retry_delay_ms,
            },
        ));
        wire_buttons(&document, app.clone(), api.clone());
        probe_backend(api, &document);

        request_animation_frame(app, ctx);
    }

    /// Subscribe the simulation and the status line to transport events.
    fn register_event_handlers(
        transport: &SharedTransport,
        app: &SharedApp,
        document: &Document,
    ) {
        let mut t = transport.borrow_mut();

        {
            let app = app.clone();
            t.on(EventKind::Walker, move |env| {
                let event = env.walker().map_err(|e| to_handler_err(&e))?;
                let user = event.user.unwrap_or_else(|| "anon".to_string());
                // Random entry side, matching the backend's own spawns
                let origin = if js_sys::Math::random() < 0.5 {
                    Some(0.0)
                } else {
                    Some(STAGE_WIDTH)
                };
                app.borrow_mut().registry.spawn_walker(origin, &user);
                Ok(())
            });
        }

        {
            let app = app.clone();
            t.on(EventKind::Donation, move |env| {
                let event = env.donation().map_err(|e| to_handler_err(&e))?;
                let user = event.user.unwrap_or_else(|| "anon".to_string());
                let mut a = app.borrow_mut();
                let pos = glam::Vec2::new(
                    100.0 + js_sys::Math::random() as f32 * (STAGE_WIDTH - 200.0),
                    150.0 + js_sys::Math::random() as f32 * 200.0,
                );
                a.registry
                    .spawn_donation_effect(pos, event.amount, &user, event.message.clone());
                a.registry.spawn_object(None);
                a.registry
                    .spawn_floating_text(format!("{user} · ${:.2}", event.amount), pos);
                Ok(())
            });
        }

        t.on(EventKind::Connection, |env| {
            log::info!("server greeting: {}", env.payload);
            Ok(())
        });
        t.on(EventKind::Heartbeat, |_| Ok(()));

        for (kind, label, class) in [
            (EventKind::Connecting, "connecting…", "status connecting"),
            (EventKind::Open, "live", "status live"),
            (EventKind::Close, "offline", "status offline"),
        ] {
            let status = document.get_element_by_id("connection-status");
            t.on(kind, move |_| {
                if let Some(el) = &status {
                    el.set_text_content(Some(label));
                    let _ = el.set_attribute("class", class);
                }
                Ok(())
            });
        }
    }

    fn to_handler_err(err: &dyn std::fmt::Display) -> stagewalk::transport::HandlerError {
        stagewalk::transport::HandlerError(err.to_string())
    }

    /// Open the socket and feed its callbacks into the transport. A non-manual
    /// close schedules this same function again after the delay the transport
    /// hands back.
    fn connect_event_channel(ws_url: String, transport: SharedTransport) {
        if !transport.borrow_mut().begin_connect() {
            return;
        }

        let ws = match WebSocket::new(&ws_url) {
            Ok(ws) => ws,
            Err(err) => {
                let mut t = transport.borrow_mut();
                t.handle_error(&format!("{err:?}"));
                if let Some(delay) = t.handle_close() {
                    drop(t);
                    schedule_reconnect(ws_url, transport, delay);
                }
                return;
            }
        };

        {
            let ws = ws.clone();
            transport.borrow_mut().set_sink(move |frame| {
                ws.send_with_str(frame).map_err(|e| format!("{e:?}"))
            });
        }
        {
            let transport = transport.clone();
            let onopen = Closure::<dyn FnMut()>::new(move || {
                transport.borrow_mut().handle_open();
            });
            ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
            onopen.forget();
        }
        {
            let transport = transport.clone();
            let onmessage = Closure::<dyn FnMut(_)>::new(move |event: MessageEvent| {
                if let Some(text) = event.data().as_string() {
                    transport.borrow_mut().handle_message(&text);
                }
            });
            ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
            onmessage.forget();
        }
        {
            let transport = transport.clone();
            let onerror = Closure::<dyn FnMut(_)>::new(move |_: web_sys::ErrorEvent| {
                transport.borrow_mut().handle_error("socket error");
            });
            ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
            onerror.forget();
        }
        {
            let transport = transport.clone();
            let onclose = Closure::<dyn FnMut(_)>::new(move |event: CloseEvent| {
                log::info!("socket closed (code {})", event.code());
                let delay = transport.borrow_mut().handle_close();
                if let Some(delay) = delay {
                    schedule_reconnect(ws_url.clone(), transport.clone(), delay);
                }
            });
            ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
            onclose.forget();
        }
    }

    fn schedule_reconnect(ws_url: String, transport: SharedTransport, delay_ms: f64) {
        let window = web_sys::window().expect("no window");
        let retry = Closure::once(move || {
            connect_event_channel(ws_url, transport);
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            retry.as_ref().unchecked_ref(),
            delay_ms as i32,
        );
        retry.forget();
    }

    /// Hook the simulate buttons up to the command client. A command that
    /// fails after all retries still spawns locally so the stage reacts.
    fn wire_buttons(document: &Document, app: SharedApp, api: Rc<ApiClient>) {
        if let Some(btn) = document.get_element_by_id("spawn-walker") {
            let app = app.clone();
            let api = api.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_: web_sys::MouseEvent| {
                let app = app.clone();
                let api = api.clone();
                let user = format!("Usuario{}", (js_sys::Math::random() * 1000.0) as u32);
                wasm_bindgen_futures::spawn_local(async move {
                    let cmd = CommandRequest::walker(&user);
                    if let Err(err) = api.submit(&cmd).await {
                        log::warn!("walker command failed, spawning locally: {err}");
                        app.borrow_mut().registry.spawn_walker(None, &user);
                    }
                });
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("spawn-donation") {
            let document = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_: web_sys::MouseEvent| {
                let amount = document
                    .get_element_by_id("donation-amount")
                    .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                    .and_then(|input| input.value().parse::<f64>().ok())
                    .unwrap_or(10.0);
                let app = app.clone();
                let api = api.clone();
                let user = format!("Fan{}", (js_sys::Math::random() * 1000.0) as u32);
                wasm_bindgen_futures::spawn_local(async move {
                    let cmd = CommandRequest::donation(&user, amount, None);
                    if let Err(err) = api.submit(&cmd).await {
                        log::warn!("donation command failed, spawning locally: {err}");
                        let mut a = app.borrow_mut();
                        let pos = glam::Vec2::new(STAGE_WIDTH / 2.0, STAGE_HEIGHT / 2.0);
                        a.registry.spawn_donation_effect(pos, amount, &user, None);
                        a.registry.spawn_object(None);
                    }
                });
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn probe_backend(api: Rc<ApiClient>, document: &Document) {
        let status = document.get_element_by_id("backend-status");
        wasm_bindgen_futures::spawn_local(async move {
            let healthy = api.health().await;
            if let Some(el) = status {
                el.set_text_content(Some(if healthy { "backend: up" } else { "backend: down" }));
            }
            if !healthy {
                log::warn!("backend health probe failed, commands will fall back to local spawns");
            }
        });
    }

    fn request_animation_frame(app: SharedApp, ctx: CanvasRenderingContext2d) {
        let window = web_sys::window().expect("no window");
        let closure = Closure::once(move |time: f64| {
            frame(app, ctx, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame(app: SharedApp, ctx: CanvasRenderingContext2d, time: f64) {
        {
            let a = &mut *app.borrow_mut();
            a.ticker.tick(&mut a.registry, time);
            render(&a.registry, &ctx);
        }
        request_animation_frame(app, ctx);
    }

    fn render(reg: &EntityRegistry, ctx: &CanvasRenderingContext2d) {
        let (w, h) = (STAGE_WIDTH as f64, STAGE_HEIGHT as f64);
        ctx.set_global_alpha(1.0);
        ctx.set_fill_style_str("#1e272e");
        ctx.fill_rect(0.0, 0.0, w, h);
        ctx.set_fill_style_str("#485460");
        ctx.fill_rect(0.0, GROUND_Y as f64, w, h - GROUND_Y as f64);

        for obj in reg.objects() {
            let glow = obj.glow_intensity() as f64;
            ctx.set_global_alpha(0.5 + glow * 0.5);
            ctx.set_fill_style_str("#ffd32a");
            ctx.begin_path();
            let _ = ctx.arc(
                obj.pos.x as f64,
                obj.pos.y as f64,
                (OBJECT_SIZE / 2.0) as f64,
                0.0,
                std::f64::consts::TAU,
            );
            ctx.fill();
        }

        for walker in reg.walkers() {
            let x = walker.pos.x as f64;
            let y = (walker.pos.y - walker.y_offset()) as f64;
            ctx.set_global_alpha(1.0);
            ctx.set_fill_style_str("#0be881");
            ctx.fill_rect(x, y, FRAME_WIDTH as f64, FRAME_HEIGHT as f64);
            // Leg swing from the walk-cycle frame
            let stride = (walker.frame_cursor.floor() as f64 - 1.5) * 4.0;
            ctx.set_fill_style_str("#05c46b");
            ctx.fill_rect(x + 12.0 + stride, y + 48.0, 12.0, 16.0);
            ctx.fill_rect(x + 40.0 - stride, y + 48.0, 12.0, 16.0);
            ctx.set_fill_style_str("#d2dae2");
            ctx.set_font("12px sans-serif");
            let _ = ctx.fill_text(&walker.owner, x, y - 6.0);
        }

        for effect in reg.effects() {
            ctx.set_global_alpha(effect.alpha as f64);
            for p in &effect.particles {
                ctx.set_fill_style_str(p.color);
                let size = (p.size * p.life) as f64;
                ctx.fill_rect(
                    p.pos.x as f64 - size / 2.0,
                    p.pos.y as f64 - size / 2.0,
                    size,
                    size,
                );
            }
            ctx.set_fill_style_str("#ffffff");
            ctx.set_font(&format!("{}px sans-serif", (24.0 * effect.scale) as u32));
            let _ = ctx.fill_text(
                &format!("{} ${:.2}", effect.user, effect.amount),
                effect.pos.x as f64,
                effect.pos.y as f64,
            );
            if let Some(msg) = &effect.message {
                ctx.set_font("13px sans-serif");
                let _ = ctx.fill_text(msg, effect.pos.x as f64, effect.pos.y as f64 + 20.0);
            }
        }

        for text in reg.texts() {
            ctx.set_global_alpha(text.alpha as f64);
            ctx.set_fill_style_str("#ffffff");
            ctx.set_font("14px sans-serif");
            let _ = ctx.fill_text(&text.text, text.pos.x as f64, text.pos.y as f64);
        }
        ctx.set_global_alpha(1.0);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_app::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("stagewalk (native) starting...");
    log::info!("the stage is browser-only - run with `trunk serve` for the web version");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
