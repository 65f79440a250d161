mod test_utils;
use test_utils::ServerTestingExt;

use envoy_actions::http::Method;
use envoy_actions::{ActionRegistry, ActionsConfig, Server, StatusCode};

macro_rules! counted_hook {
    ($action:ident, |$server:ident| $body:block) => {
        pub struct $action;

        impl $action {
            pub fn calls() -> usize {
                CALLS.load(std::sync::atomic::Ordering::SeqCst)
            }
        }

        static CALLS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

        #[envoy_actions::prelude::async_trait]
        impl envoy_actions::Action for $action {
            type Input = serde_json::Value;
            type Output = &'static str;

            async fn handle(&self, _input: serde_json::Value) -> envoy_actions::Result<&'static str> {
                Ok(stringify!($action))
            }
        }

        impl envoy_actions::AsController for $action {}

        impl envoy_actions::RouteProvider for $action {
            fn routes($server: &mut envoy_actions::Server) -> envoy_actions::Result {
                CALLS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                $body
            }
        }
    };
}

async fn ok(ctx: &mut envoy_actions::Context) -> envoy_actions::Result {
    let path = ctx.url().path().to_string();
    ctx.set_body(path);
    Ok(())
}

mod scenario {
    use envoy_actions::prelude::*;

    /// An action without a route hook. It cannot be registered.
    #[derive(Debug, Default)]
    pub struct A;

    #[async_trait]
    impl Action for A {
        type Input = ();
        type Output = ();

        async fn handle(&self, _input: ()) -> envoy_actions::Result<()> {
            Ok(())
        }
    }

    pub mod b {
        counted_hook!(B, |server| {
            server.at("/b").get(envoy_actions::ActionEndpoint::new(B));
            Ok(())
        });
    }

    pub mod c {
        counted_hook!(C, |server| {
            let c = std::sync::Arc::new(C);
            server.at("/c1").get(envoy_actions::ActionEndpoint::shared(c.clone()));
            server.at("/c2").post(envoy_actions::ActionEndpoint::shared(c));
            Ok(())
        });
    }
}

fn scenario_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry
        .register::<scenario::c::C>()
        .register::<scenario::b::B>();
    registry
}

#[tokio::test]
async fn registers_every_hook_under_the_root() {
    let mut app = envoy_actions::new();
    let invoked = scenario_registry()
        .register_routes_in(&mut app, ["scenario"])
        .unwrap();

    assert_eq!(invoked, 2);
    let routes: Vec<_> = app
        .routes()
        .iter()
        .map(|r| (r.method(), r.path(), r.handler()))
        .collect();
    assert_eq!(
        routes,
        vec![
            (Some(Method::Get), "/b", "registrar::scenario::b::B"),
            (Some(Method::Get), "/c1", "registrar::scenario::c::C"),
            (Some(Method::Post), "/c2", "registrar::scenario::c::C"),
        ]
    );

    assert_eq!(app.recv_string("/c1").await, "\"C\"");
    assert_eq!(app.get("/a").await.status(), StatusCode::NotFound);
}

#[test]
fn roots_without_actions_register_nothing() {
    let mut app = envoy_actions::new();
    app.at("/existing").get(ok);

    let registry = scenario_registry();
    assert_eq!(registry.register_routes_in(&mut app, ["nowhere"]).unwrap(), 0);
    assert_eq!(
        registry
            .register_routes_in(&mut app, Vec::<&str>::new())
            .unwrap(),
        0
    );
    assert_eq!(ActionRegistry::new().register_routes(&mut app).unwrap(), 0);
    assert_eq!(app.routes().len(), 1);
}

#[test]
fn running_twice_registers_twice() {
    let mut app = envoy_actions::new();
    let registry = scenario_registry();

    registry.register_routes_in(&mut app, ["scenario"]).unwrap();
    registry.register_routes_in(&mut app, ["scenario"]).unwrap();

    assert_eq!(app.routes().len(), 6);
    assert_eq!(app.routes()[0], app.routes()[3]);
}

#[test]
fn runs_are_deterministic() {
    let registry = scenario_registry();
    let mut reversed = ActionRegistry::new();
    reversed
        .register::<scenario::b::B>()
        .register::<scenario::c::C>();

    let mut first = envoy_actions::new();
    let mut second = envoy_actions::new();
    registry.register_routes_in(&mut first, ["scenario"]).unwrap();
    reversed.register_routes_in(&mut second, ["scenario"]).unwrap();

    assert_eq!(first.routes(), second.routes());
}

#[test]
fn default_roots_come_from_config() {
    let mut app = envoy_actions::new();
    let registry = scenario_registry().with_config(ActionsConfig::new(["registrar::scenario::c"]));

    assert_eq!(registry.register_routes(&mut app).unwrap(), 1);
    assert_eq!(app.routes().len(), 2);
}

mod nested {
    counted_hook!(Outer, |server| {
        server.at("/outer").get(super::ok);
        Ok(())
    });

    pub mod inner {
        counted_hook!(Inner, |server| {
            server.at("/inner").get(super::super::ok);
            Ok(())
        });
    }
}

#[test]
fn overlapping_roots_invoke_each_hook_once() {
    let mut registry = ActionRegistry::new();
    registry
        .register::<nested::Outer>()
        .register::<nested::inner::Inner>()
        .register::<nested::inner::Inner>();

    let mut app = envoy_actions::new();
    let invoked = registry
        .register_routes_in(&mut app, ["nested::inner", "nested", "registrar/nested"])
        .unwrap();

    assert_eq!(invoked, 2);
    assert_eq!(nested::Outer::calls(), 1);
    assert_eq!(nested::inner::Inner::calls(), 1);

    let paths: Vec<_> = app.routes().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/inner", "/outer"]);
}

mod generic {
    use std::marker::PhantomData;

    pub trait Format: 'static {
        const PATH: &'static str;
    }

    pub struct Csv;
    pub struct Json;

    impl Format for Csv {
        const PATH: &'static str = "/export.csv";
    }

    impl Format for Json {
        const PATH: &'static str = "/export.json";
    }

    pub struct Export<F>(PhantomData<F>);

    impl<F: Format> envoy_actions::RouteProvider for Export<F> {
        fn routes(server: &mut envoy_actions::Server) -> envoy_actions::Result {
            server.at(F::PATH).get(super::ok);
            Ok(())
        }
    }
}

#[tokio::test]
async fn generic_instantiations_are_separate_actions() {
    use generic::{Csv, Export, Json};

    let mut registry = ActionRegistry::new();
    registry
        .register::<Export<Json>>()
        .register::<Export<Csv>>()
        .register::<Export<Json>>();

    let mut app = envoy_actions::new();
    let invoked = registry.register_routes_in(&mut app, ["generic"]).unwrap();

    assert_eq!(invoked, 2);
    let paths: Vec<_> = app.routes().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/export.csv", "/export.json"]);
    assert_eq!(app.recv_string("/export.json").await, "/export.json");
}

mod dir_x {
    counted_hook!(Zulu, |server| {
        server.at("/x").get(super::ok);
        Ok(())
    });
}

mod dir_y {
    counted_hook!(Alpha, |server| {
        server.at("/y").get(super::ok);
        Ok(())
    });
}

#[test]
fn roots_are_walked_in_the_given_order() {
    let mut registry = ActionRegistry::new();
    registry
        .register::<dir_y::Alpha>()
        .register::<dir_x::Zulu>();

    let mut app = envoy_actions::new();
    registry
        .register_routes_in(&mut app, ["dir_x", "dir_y"])
        .unwrap();
    let paths: Vec<_> = app.routes().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/x", "/y"]);

    let mut app = envoy_actions::new();
    registry
        .register_routes_in(&mut app, ["dir_y", "dir_x"])
        .unwrap();
    let paths: Vec<_> = app.routes().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/y", "/x"]);
}

mod failing {
    counted_hook!(Alpha, |server| {
        server.at("/alpha").get(super::ok);
        Ok(())
    });

    pub mod broken {
        counted_hook!(Broken, |_server| {
            Err(envoy_actions::Error::from_str(
                envoy_actions::StatusCode::InternalServerError,
                "missing mailer configuration",
            ))
        });
    }

    pub mod charlie {
        counted_hook!(Charlie, |server| {
            server.at("/charlie").get(super::super::ok);
            Ok(())
        });
    }
}

#[test]
fn a_failing_hook_stops_the_run() {
    let mut registry = ActionRegistry::new();
    registry
        .register::<failing::charlie::Charlie>()
        .register::<failing::broken::Broken>()
        .register::<failing::Alpha>();

    let mut app = Server::new();
    let err = registry
        .register_routes_in(&mut app, ["failing"])
        .unwrap_err();

    assert_eq!(err.action(), "registrar::failing::broken::Broken");
    assert_eq!(err.error().to_string(), "missing mailer configuration");
    assert_eq!(
        err.to_string(),
        "failed to register routes for action `registrar::failing::broken::Broken`: missing mailer configuration"
    );
    assert_eq!(
        err.into_inner().status(),
        StatusCode::InternalServerError
    );

    let paths: Vec<_> = app.routes().iter().map(|r| r.path()).collect();
    assert_eq!(paths, vec!["/alpha"]);
    assert_eq!(failing::charlie::Charlie::calls(), 0);
}
