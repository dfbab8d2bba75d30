use rand::Rng;
use shared::Coordinate;
use tracing::{info, warn};

use crate::{
    client::{SmartRouteClient, build_http_client},
    config::PlannerConfig,
    error::PlannerError,
    sources::{DirectionsSource, Interpolator, OsrmSource, RouteCandidate, RouteSource, SmartRouteSource},
};

/// Sources tried in order, then the interpolator, which cannot fail.
pub struct FallbackChain {
    sources: Vec<Box<dyn RouteSource>>,
    interpolator: Interpolator,
}

impl FallbackChain {
    pub fn new(sources: Vec<Box<dyn RouteSource>>) -> Self {
        Self {
            sources,
            interpolator: Interpolator,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlannerError> {
        Ok(Self::with_http(config, build_http_client(config)?))
    }

    /// SmartRoute, then the directions provider, then OSRM, all sharing `http`.
    pub fn with_http(config: &PlannerConfig, http: reqwest::Client) -> Self {
        Self::new(vec![
            Box::new(SmartRouteSource::new(SmartRouteClient::new(
                config.api_root.clone(),
                http.clone(),
            ))),
            Box::new(DirectionsSource::new(
                config.directions_url.clone(),
                config.directions_api_key.clone(),
                http.clone(),
            )),
            Box::new(OsrmSource::new(config.osrm_url.clone(), http)),
        ])
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub async fn resolve<R: Rng>(&self, start: Coordinate, end: Coordinate, rng: &mut R) -> RouteCandidate {
        for source in &self.sources {
            match source.fetch_route(start, end).await {
                Ok(candidate) => {
                    info!(
                        source = source.name(),
                        points = candidate.path.len(),
                        distance_km = candidate.distance_km,
                        "route resolved"
                    );
                    return candidate;
                }
                Err(err) => warn!(source = source.name(), "route source failed: {err}"),
            }
        }

        info!("all routing services failed, interpolating between endpoints");
        self.interpolator.synthesize(start, end, rng)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::Cell, rc::Rc};

    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::sources::RouteOrigin;

    pub(crate) struct Failing {
        pub calls: Rc<Cell<u32>>,
    }

    #[async_trait(?Send)]
    impl RouteSource for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch_route(&self, _: Coordinate, _: Coordinate) -> Result<RouteCandidate, PlannerError> {
            self.calls.set(self.calls.get() + 1);
            Err(PlannerError::Rejected("no route".into()))
        }
    }

    pub(crate) struct Fixed {
        pub candidate: RouteCandidate,
        pub calls: Rc<Cell<u32>>,
    }

    #[async_trait(?Send)]
    impl RouteSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_route(&self, _: Coordinate, _: Coordinate) -> Result<RouteCandidate, PlannerError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.candidate.clone())
        }
    }

    pub(crate) fn straight_route(origin: RouteOrigin) -> RouteCandidate {
        RouteCandidate::plain(
            origin,
            vec![Coordinate::new(28.60, 77.20), Coordinate::new(28.65, 77.25)],
            7.3,
            12.0,
        )
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        futures::executor::block_on(future)
    }

    const START: Coordinate = Coordinate::new(28.60, 77.20);
    const END: Coordinate = Coordinate::new(28.65, 77.25);

    #[test]
    fn test_first_successful_source_wins() {
        let failing_calls = Rc::new(Cell::new(0));
        let osrm_calls = Rc::new(Cell::new(0));
        let never_calls = Rc::new(Cell::new(0));
        let chain = FallbackChain::new(vec![
            Box::new(Failing {
                calls: failing_calls.clone(),
            }),
            Box::new(Fixed {
                candidate: straight_route(RouteOrigin::Osrm),
                calls: osrm_calls.clone(),
            }),
            Box::new(Fixed {
                candidate: straight_route(RouteOrigin::Directions),
                calls: never_calls.clone(),
            }),
        ]);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let route = block_on(chain.resolve(START, END, &mut rng));
        assert_eq!(route.origin, RouteOrigin::Osrm);
        assert_eq!(failing_calls.get(), 1);
        assert_eq!(osrm_calls.get(), 1);
        assert_eq!(never_calls.get(), 0);
    }

    #[test]
    fn test_exhausted_chain_interpolates() {
        let calls = Rc::new(Cell::new(0));
        let chain = FallbackChain::new(vec![
            Box::new(Failing { calls: calls.clone() }),
            Box::new(Failing { calls: calls.clone() }),
            Box::new(Failing { calls: calls.clone() }),
        ]);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let route = block_on(chain.resolve(START, END, &mut rng));
        assert_eq!(calls.get(), 3);
        assert_eq!(route.origin, RouteOrigin::Interpolated);
        assert_eq!(route.path.len(), 51);
    }

    #[test]
    fn test_empty_chain_interpolates() {
        let chain = FallbackChain::new(Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let route = block_on(chain.resolve(START, END, &mut rng));
        assert_eq!(route.origin, RouteOrigin::Interpolated);
    }

    #[test]
    fn test_default_order() {
        let chain = FallbackChain::from_config(&PlannerConfig::default()).unwrap();
        assert_eq!(chain.source_names(), vec!["smartroute", "directions", "osrm"]);
    }
}
