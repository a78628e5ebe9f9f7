use std::sync::Arc;

use anyhow::{Context, Result};
use dispatch_api::create_app;
use dispatch_core::AppConfig;
use dispatch_dispatcher::{
    DeliveryService, DispatchCollaborators, DispatchEngine, OrderIntake, SessionRegistry,
};
use dispatch_domain::MessageQueue;
use dispatch_infrastructure::{
    create_delivery_store, init_metrics, DispatchMetrics, DistrictGeocoder, LoggingNotifier,
    MessageQueueFactory, StaticRosterSelector,
};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// 主应用程序
pub struct Application {
    config: AppConfig,
    intake: Arc<OrderIntake>,
    service: Arc<DeliveryService>,
}

impl Application {
    /// 创建应用实例并连接所有外部依赖
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化派单引擎");

        if config.observability.metrics_enabled {
            init_metrics(&config.observability.metrics_bind_address)
                .context("启动指标导出器失败")?;
            info!(
                "Prometheus指标导出在 {}",
                config.observability.metrics_bind_address
            );
        }

        info!("连接消息队列: {}", mask_amqp_url(&config.message_queue.url));
        let message_queue: Arc<dyn MessageQueue> =
            MessageQueueFactory::create(&config.message_queue)
                .await
                .context("连接消息队列失败")?;

        let store = create_delivery_store(&config.database)
            .await
            .context("创建配送记录存储失败")?;

        let metrics = Arc::new(DispatchMetrics::new());
        let registry = Arc::new(SessionRegistry::new(config.dispatch.retired_retention()));

        let collaborators = DispatchCollaborators {
            selector: Arc::new(StaticRosterSelector::new(
                config.dispatch.rider_roster.clone(),
            )),
            resolver: Arc::new(DistrictGeocoder::new()),
            notifier: Arc::new(LoggingNotifier::new()),
            store: store.clone(),
            message_queue: message_queue.clone(),
        };

        let engine = Arc::new(DispatchEngine::new(
            registry.clone(),
            collaborators,
            metrics.clone(),
            &config.dispatch,
            &config.message_queue,
        ));
        let intake = Arc::new(OrderIntake::new(
            engine,
            message_queue,
            metrics.clone(),
            &config.dispatch,
            &config.message_queue,
        ));
        let service = Arc::new(DeliveryService::new(registry, store, metrics));

        Ok(Self {
            config,
            intake,
            service,
        })
    }

    /// 运行订单事件监听和HTTP服务，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let intake_handle = {
            let intake = Arc::clone(&self.intake);
            tokio::spawn(async move {
                if let Err(e) = intake.listen_for_orders().await {
                    error!("订单事件监听失败: {}", e);
                }
            })
        };

        let api_handle = if self.config.api.enabled {
            Some(self.start_api(shutdown_rx.resubscribe()).await?)
        } else {
            info!("API服务已禁用");
            None
        };

        let _ = shutdown_rx.recv().await;
        info!("派单引擎收到关闭信号");

        self.intake.stop().await?;
        if let Err(e) = intake_handle.await {
            error!("订单事件监听任务异常退出: {}", e);
        }
        if let Some(handle) = api_handle {
            if let Err(e) = handle.await {
                error!("API服务任务异常退出: {}", e);
            }
        }

        info!(
            "派单引擎已停止，仍有 {} 个派单任务未完成",
            self.intake.in_flight()
        );
        Ok(())
    }

    async fn start_api(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let bind_address = &self.config.api.bind_address;
        let app = create_app(Arc::clone(&self.service), &self.config.api);

        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;
        info!("API服务器启动在 http://{}", bind_address);

        Ok(tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("API服务器运行失败: {}", e);
            }
        }))
    }
}

/// 屏蔽AMQP URL中的密码
fn mask_amqp_url(url: &str) -> String {
    let authority_start = url.find("://").map(|pos| pos + 3).unwrap_or(0);
    if let Some(at_pos) = url[authority_start..].find('@').map(|pos| pos + authority_start) {
        if let Some(colon_pos) = url[authority_start..at_pos]
            .find(':')
            .map(|pos| pos + authority_start)
        {
            let mut masked = url.to_string();
            masked.replace_range(colon_pos + 1..at_pos, "***");
            return masked;
        }
    }
    url.to_string()
}
