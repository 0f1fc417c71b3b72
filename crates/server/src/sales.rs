use api_types::sale::{Module, SaleLineView, SaleNew, SaleView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{LineItem, ModuleKind, Sale, SaleCmd, User};

use crate::{ServerError, server::ServerState};

fn module_kind(module: Module) -> ModuleKind {
    match module {
        Module::SelfSale => ModuleKind::SelfSale,
        Module::OperatorSale => ModuleKind::OperatorSale,
    }
}

fn view(sale: Sale) -> SaleView {
    SaleView {
        id: sale.id,
        shop_id: sale.shop_id,
        module: match sale.module {
            ModuleKind::SelfSale => Module::SelfSale,
            ModuleKind::OperatorSale => Module::OperatorSale,
        },
        operator_id: sale.operator_id,
        sender_id: sale.sender_id,
        amount_minor: sale.amount.cents(),
        created_at: sale.created_at,
        lines: sale
            .lines
            .into_iter()
            .map(|line| SaleLineView {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price_minor: line.unit_price.cents(),
                price_minor: line.price.cents(),
            })
            .collect(),
    }
}

pub async fn sale_new(
    Extension(operator): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<SaleNew>,
) -> Result<(StatusCode, Json<SaleView>), ServerError> {
    let cmd = SaleCmd {
        operator_id: operator.id,
        shop_id: payload.shop_id,
        module: module_kind(payload.module),
        client: payload.client,
        lines: payload
            .lines
            .into_iter()
            .map(|line| LineItem {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect(),
    };
    let sale = state.engine.record_sale(cmd).await?;

    Ok((StatusCode::CREATED, Json(view(sale))))
}

pub async fn get(
    Extension(requester): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<SaleView>, ServerError> {
    let sale = state.engine.sale(requester.id, id).await?;

    Ok(Json(view(sale)))
}
