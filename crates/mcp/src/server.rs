use std::sync::Arc;

use anyhow::{anyhow, Result};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourcesResult, PaginatedRequestParam, Prompt,
        PromptMessage, PromptMessageRole, ProtocolVersion, RawResource, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo, Tool,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use wind_core::dates::{format_today, COMPACT_DATE_FORMAT};
use windpy::WindError;

use crate::calendar::{self, TdaysCountRequest, TdaysOffsetRequest, TdaysRequest};
use crate::diagnostics::{self, RuntimeInfo};
use crate::market::{self, WsdRequest, WsesRequest, WsqRequest, WssRequest};
use crate::reference::{self, ReferenceDoc};
use crate::session::{ConnectionStatus, WindSession};
use crate::types::ErrorPayload;

pub const SERVER_NAME: &str = "wind_mcp";
pub const DOC_RESOURCE_URI: &str = "resource://windpy-doc";
pub const EXAMPLE_PROMPT: &str = "windpy-example";

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TodayDateRequest {
    #[serde(default = "default_date_format")]
    #[schemars(description = "strftime 日期格式，默认 \"%Y%m%d\"")]
    pub fmt: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct DocSearchRequest {
    #[schemars(description = "检索关键词或自然语言问题，如 \"w.wsd 参数\"")]
    pub query: String,
}

#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct DateFunctionsRequest {
    #[serde(default)]
    #[schemars(description = "tdays / tdaysoffset / tdayscount；留空返回全部")]
    pub function_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct StartPayload {
    #[serde(rename = "ErrorCode")]
    error_code: i64,
    #[serde(flatten)]
    status: ConnectionStatus,
}

fn default_date_format() -> String {
    COMPACT_DATE_FORMAT.to_string()
}

/// MCP service exposing the WindPy query family as tools.
#[derive(Clone)]
pub struct WindMcpServer {
    session: Arc<WindSession>,
    reference: Arc<ReferenceDoc>,
    runtime: Arc<RuntimeInfo>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WindMcpServer {
    pub fn new(session: Arc<WindSession>, reference: ReferenceDoc, runtime: RuntimeInfo) -> Self {
        Self {
            session,
            reference: Arc::new(reference),
            runtime: Arc::new(runtime),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "获取服务器当前日期。fmt 为 strftime 格式，默认 \"%Y%m%d\"，返回 {\"today\": \"20240604\"}")]
    async fn get_today_date(
        &self,
        Parameters(request): Parameters<TodayDateRequest>,
    ) -> Result<CallToolResult, McpError> {
        match format_today(&request.fmt) {
            Ok(today) => json_result(&json!({ "today": today })),
            Err(err) => json_result(&json!({ "error": err.to_string() })),
        }
    }

    #[tool(description = "检索 WindPy 函数文档，返回包含关键词的段落（前后各两行上下文）")]
    async fn search_windpy_doc(
        &self,
        Parameters(request): Parameters<DocSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        if request.query.trim().is_empty() {
            return Err(McpError::invalid_params("query 不能为空", None));
        }
        json_result(&self.reference.search(&request.query))
    }

    #[tool(description = "列出可直接用于 fields 参数的中文常用指标名及其 Wind 代码")]
    async fn get_common_indicators(&self) -> Result<CallToolResult, McpError> {
        json_result(&json!({ "indicators": reference::common_indicators() }))
    }

    #[tool(description = "查询 Wind 日期函数（tdays/tdaysoffset/tdayscount）的说明、参数与日期宏")]
    async fn get_date_functions(
        &self,
        Parameters(request): Parameters<DateFunctionsRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&reference::date_functions(request.function_name.as_deref()))
    }

    #[tool(description = "获取日时间序列数据（w.wsd），返回 ErrorCode、Data、Codes、Fields、Times")]
    async fn wind_wsd(
        &self,
        Parameters(request): Parameters<WsdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let call = request.to_call().map_err(invalid_params)?;
        respond(market::fetch_table(&self.session, &call).await)
    }

    #[tool(description = "获取日截面数据（w.wss），返回 ErrorCode、Data、Codes、Fields、Times")]
    async fn wind_wss(
        &self,
        Parameters(request): Parameters<WssRequest>,
    ) -> Result<CallToolResult, McpError> {
        let call = request.to_call().map_err(invalid_params)?;
        respond(market::fetch_table(&self.session, &call).await)
    }

    #[tool(description = "获取板块日序列数据（w.wses），fields 仅支持单指标")]
    async fn wind_wses(
        &self,
        Parameters(request): Parameters<WsesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let call = request.to_call().map_err(invalid_params)?;
        respond(market::fetch_table(&self.session, &call).await)
    }

    #[tool(description = "获取实时行情快照（w.wsq），如 codes=\"000001.SH\", fields=\"rt_last\"")]
    async fn wind_wsq(
        &self,
        Parameters(request): Parameters<WsqRequest>,
    ) -> Result<CallToolResult, McpError> {
        let call = request.to_call().map_err(invalid_params)?;
        respond(market::fetch_table(&self.session, &call).await)
    }

    #[tool(description = "获取区间内日期序列（w.tdays），返回 ErrorCode 与 TradingDays（YYYYMMDD 列表）")]
    async fn wind_tdays(
        &self,
        Parameters(request): Parameters<TdaysRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(calendar::fetch_tdays(&self.session, &request).await)
    }

    #[tool(description = "获取偏移后的日期（w.tdaysoffset），offset>0 后推，<0 前推，返回 OffsetDate")]
    async fn wind_tdaysoffset(
        &self,
        Parameters(request): Parameters<TdaysOffsetRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(calendar::fetch_tdays_offset(&self.session, &request).await)
    }

    #[tool(description = "获取区间内日期数量（w.tdayscount），返回 ErrorCode 与 Count")]
    async fn wind_tdayscount(
        &self,
        Parameters(request): Parameters<TdaysCountRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(calendar::fetch_tdays_count(&self.session, &request).await)
    }

    #[tool(description = "查询 Wind API 会话连接状态")]
    async fn wind_connection_status(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.session.status().await)
    }

    #[tool(description = "重新启动 Wind API 会话（w.stop 后 w.start），返回 ErrorCode 与连接状态")]
    async fn wind_start(&self) -> Result<CallToolResult, McpError> {
        info!("收到 wind_start 请求");
        let outcome = self.session.restart().await.map(|status| StartPayload {
            error_code: status.last_start_code.unwrap_or(-1),
            status,
        });
        respond(outcome)
    }

    #[tool(description = "诊断 MCP 服务状态：主机、进程、传输方式、Wind 连接与已注册工具")]
    async fn mcp_diagnostics(&self) -> Result<CallToolResult, McpError> {
        let tools = self.tools();
        json_result(&diagnostics::collect(&self.session, &self.runtime, &tools).await)
    }
}

impl WindMcpServer {
    pub fn session(&self) -> &Arc<WindSession> {
        &self.session
    }

    pub fn runtime(&self) -> &RuntimeInfo {
        &self.runtime
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    pub fn read_doc(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        if uri != DOC_RESOURCE_URI {
            return Err(McpError::resource_not_found(format!("未知资源: {uri}"), None));
        }
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(
                self.reference.text(),
                DOC_RESOURCE_URI,
            )],
        })
    }

    pub fn example_prompt(&self, name: &str) -> Result<GetPromptResult, McpError> {
        if name != EXAMPLE_PROMPT {
            return Err(McpError::invalid_params(format!("未知提示词: {name}"), None));
        }
        let examples = self.reference.search("示例:").summary;
        Ok(GetPromptResult {
            description: Some("WindPy 常用查询示例".into()),
            messages: vec![PromptMessage::new_text(
                PromptMessageRole::User,
                format!("请参考以下 WindPy 查询示例构造工具调用：\n{examples}"),
            )],
        })
    }

    /// Run the server over stdio transport and wait until the peer disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|err| anyhow!(err))?;

        service.waiting().await.map_err(|err| anyhow!(err))?;

        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for WindMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::default()
            },
            instructions: Some(
                "Wind 金融数据网关：wind_wsd/wind_wss/wind_wses/wind_wsq 查询行情与指标，\
                 wind_tdays/wind_tdaysoffset/wind_tdayscount 处理交易日历；\
                 不确定参数时先调用 search_windpy_doc 或读取 resource://windpy-doc。"
                    .into(),
            ),
            ..ServerInfo::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut resource = RawResource::new(DOC_RESOURCE_URI, "windpy-doc");
        resource.description = Some("WindPy 核心函数参数、返回、示例和日期宏说明".into());
        resource.mime_type = Some("text/markdown".into());
        Ok(ListResourcesResult::with_all_items(vec![
            resource.no_annotation()
        ]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_doc(&request.uri)
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult::with_all_items(vec![Prompt::new(
            EXAMPLE_PROMPT,
            Some("WindPy 常用查询示例"),
            None,
        )]))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.example_prompt(&request.name)
    }
}

fn json_result<T: Serialize>(payload: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::json(payload)?]))
}

fn invalid_params(err: WindError) -> McpError {
    McpError::invalid_params(err.to_string(), None)
}

/// SDK failures become an error payload; argument problems stay protocol errors.
fn respond<T: Serialize>(result: Result<T, WindError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(payload) => json_result(&payload),
        Err(err @ WindError::InvalidArgument(_)) => Err(invalid_params(err)),
        Err(err) => {
            warn!(error = %err, "Wind 工具调用失败");
            json_result(&ErrorPayload::new(err.to_string()))
        }
    }
}
