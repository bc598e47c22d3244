use crate::{
    api::{attendance, compensation, cycle, payslip, salary_revision},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("rate limiter period and burst are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let protected_limiter = build_limiter(config.rate_protected_per_min);
    let preview_limiter = build_limiter(config.rate_preview_per_min);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/compensation").service(
                    // /compensation/preview is hit on every keystroke of the salary form
                    web::resource("/preview")
                        .wrap(preview_limiter)
                        .route(web::post().to(compensation::preview)),
                ),
            )
            .service(web::resource("/cycle").route(web::get().to(cycle::resolve)))
            .service(
                web::scope("/salary")
                    // /salary/revisions/{id}
                    .service(
                        web::resource("/revisions/{id}")
                            .route(web::put().to(salary_revision::edit_revision))
                            .route(web::delete().to(salary_revision::delete_revision)),
                    )
                    // /salary/{emp_id}/revisions
                    .service(
                        web::resource("/{emp_id}/revisions")
                            .route(web::get().to(salary_revision::list_revisions))
                            .route(web::post().to(salary_revision::add_revision)),
                    )
                    // /salary/{emp_id}/active?date=
                    .service(
                        web::resource("/{emp_id}/active")
                            .route(web::get().to(salary_revision::active_revision)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance/evaluate
                    .service(
                        web::resource("/evaluate").route(web::post().to(attendance::evaluate)),
                    )
                    // /attendance/{emp_id}/summary?year=&month=
                    .service(
                        web::resource("/{emp_id}/summary")
                            .route(web::get().to(attendance::monthly_summary)),
                    )
                    // /attendance/{emp_id}/summaries
                    .service(
                        web::resource("/{emp_id}/summaries")
                            .route(web::get().to(attendance::list_summaries)),
                    )
                    // /attendance/{emp_id}/{date}
                    .service(
                        web::resource("/{emp_id}/{date}")
                            .route(web::put().to(attendance::reconcile_record)),
                    ),
            )
            .service(
                web::scope("/payslip")
                    // /payslip/{emp_id}/{date}
                    .service(
                        web::resource("/{emp_id}/{date}").route(web::post().to(payslip::compute)),
                    ),
            ),
    );
}
