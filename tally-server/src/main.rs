use tally_common::db::create_db_thread_pool;
use tally_common::email::senders::{MockSender, SmtpRelay};
use tally_common::email::SendEmail;
use tally_common::push::senders::{HttpGateway, MockPushSender};
use tally_common::push::SendPush;
use tally_common::realtime::RoomRegistry;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::fanout::Broadcaster;

mod env;
mod fanout;
mod handlers;
mod middleware;
mod services;

// How often empty realtime rooms are swept out of the registry
const ROOM_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("127.0.0.1:{}", &port);

    let _logger = Logger::try_with_str(&env::CONF.log_level)
        .expect(
            "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
             Example: `info, my::critical::module=trace`",
        )
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    let actix_workers = env::CONF.actix_worker_count;

    // To prevent resource starvation, max connections must be at least as
    // large as the number of actix workers
    let db_max_connections = if actix_workers > env::CONF.db_max_connections as usize {
        actix_workers as u32
    } else {
        env::CONF.db_max_connections
    };

    log::info!("Connecting to database...");

    let db_uri = Zeroizing::new(format!(
        "postgres://{}:{}@{}:{}/{}",
        env::CONF.db_username,
        env::CONF.db_password,
        env::CONF.db_hostname,
        env::CONF.db_port,
        env::CONF.db_name,
    ));

    let db_thread_pool = create_db_thread_pool(&db_uri, db_max_connections);

    log::info!("Successfully connected to database");

    let smtp_thread_pool: Box<dyn SendEmail> = if env::CONF.email_enabled {
        log::info!("Connecting to SMTP relay...");

        let relay = SmtpRelay::with_credentials(
            &env::CONF.smtp_username,
            &env::CONF.smtp_key,
            &env::CONF.smtp_address,
            env::CONF.max_smtp_connections,
            env::CONF.smtp_idle_timeout,
        )
        .expect("Failed to connect to SMTP relay");

        match relay.test_connection().await {
            Ok(true) => (),
            Ok(false) => panic!("Failed to connect to SMTP relay"),
            Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
        }

        log::info!("Successfully connected to SMTP relay");

        Box::new(relay)
    } else {
        log::info!("Emails are disabled. Using mock SMTP thread pool.");
        Box::new(MockSender::new())
    };

    let smtp_thread_pool = Arc::new(smtp_thread_pool);

    let push_sender: Box<dyn SendPush> = if env::CONF.push_enabled {
        let gateway = HttpGateway::new(
            &env::CONF.push_gateway_url,
            &env::CONF.push_gateway_key,
            env::CONF.push_timeout,
        )
        .expect("Failed to build push gateway client");

        log::info!("Push notifications will be relayed to the configured gateway");

        Box::new(gateway)
    } else {
        log::info!("Push notifications are disabled. Using mock push sender.");
        Box::new(MockPushSender::new())
    };

    let push_sender = Arc::new(push_sender);

    let room_registry = RoomRegistry::new();
    let broadcaster = Broadcaster::new(
        db_thread_pool.clone(),
        room_registry.clone(),
        Arc::clone(&push_sender),
    );

    let prune_registry = room_registry.clone();
    tokio::spawn(async move {
        let mut prune_interval = tokio::time::interval(ROOM_PRUNE_INTERVAL);

        loop {
            prune_interval.tick().await;

            let pruned = prune_registry.prune().await;

            if pruned > 0 {
                log::debug!("Pruned {pruned} empty realtime rooms");
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(db_thread_pool.clone()))
            .app_data(Data::new(smtp_thread_pool.clone()))
            .app_data(Data::new(broadcaster.clone()))
            .app_data(Data::new(room_registry.clone()))
            .configure(services::api::configure)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    // All server threads have been joined; nothing reads the config anymore
    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}
