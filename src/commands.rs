//! Tauri commands for the desktop shell.

use std::collections::BTreeMap;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tauri::{AppHandle, Manager, State};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_opener::OpenerExt;

use crate::budget::BudgetQuote;
use crate::config::AppConfig;
use crate::editor::{FranchiseDraft, FranchiseField};
use crate::error::{AppError, StoreError};
use crate::export::sanitize_export_filename;
use crate::financials::{
    franchise_card_caption, franchise_outstanding, franchise_summary, root_dashboard,
    school_card_caption, school_cost_breakdown, school_dashboard, school_entry_balance,
    school_summary,
};
use crate::fund::{contributions_by_school, source_label, FundSummary, NewTransaction};
use crate::model::{Franchise, School, SchoolFinancials};
use crate::report::{inventory_csv, production_report, school_report, whatsapp_share_url};
use crate::service::UniformService;
use crate::store::Store;

type SharedService = UniformService<Box<dyn Store + Send>>;

pub struct AppState {
    config: AppConfig,
    service: Mutex<SharedService>,
    draft: Mutex<Option<FranchiseDraft>>,
}

impl AppState {
    fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store = config.open_store()?;
        Ok(Self {
            service: Mutex::new(UniformService::new(store)),
            draft: Mutex::new(None),
            config,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex
        .lock()
        .map_err(|_| "Estado do aplicativo indisponível.".to_string())
}

fn user_error(err: AppError) -> String {
    err.user_message()
}

fn find_school(schools: Vec<School>, school_id: &str) -> Result<School, String> {
    schools
        .into_iter()
        .find(|school| school.id == school_id)
        .ok_or_else(|| user_error(AppError::Missing("Escola".to_string())))
}

#[derive(Deserialize)]
struct IdRequest {
    id: String,
}

#[derive(Deserialize)]
struct NameRequest {
    name: String,
}

#[derive(Deserialize)]
struct DashboardRequest {
    #[serde(default)]
    school_id: Option<String>,
}

#[derive(Deserialize)]
struct FranchiseAddRequest {
    school_id: String,
    name: String,
}

#[derive(Deserialize)]
struct FranchiseRef {
    school_id: String,
    franchise_id: String,
}

#[derive(Deserialize)]
struct SchoolFinancialsRequest {
    school_id: String,
    financials: SchoolFinancials,
}

#[derive(Deserialize)]
struct SchoolRenameRequest {
    school_id: String,
    name: String,
}

#[derive(Deserialize)]
struct DraftItemRequest {
    product: String,
    size: String,
    #[serde(default)]
    quantity: u32,
}

#[derive(Deserialize)]
struct DraftRenameRequest {
    #[serde(default)]
    product: String,
    from: String,
    to: String,
}

#[derive(Deserialize)]
struct DraftFieldRequest {
    field: FranchiseField,
    value: String,
}

#[derive(Deserialize)]
struct BudgetRequest {
    #[serde(default)]
    quantities: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Serialize)]
struct SaveCsvResult {
    ok: bool,
    canceled: bool,
    filename: String,
    path: Option<String>,
    error: Option<String>,
}

#[tauri::command]
fn app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
fn storage_info(state: State<'_, AppState>) -> Result<serde_json::Value, String> {
    let service = lock(&state.service)?;
    Ok(json!({
        "ok": true,
        "backend": service.describe_store(),
        "remote": state.config.remote.is_some(),
        "path_label": state.config.data_dir.to_string_lossy(),
        "fund_target": state.config.fund_target,
    }))
}

#[tauri::command]
fn schools_list(state: State<'_, AppState>) -> Result<Vec<School>, String> {
    lock(&state.service)?.load_schools().map_err(user_error)
}

fn franchise_card(franchise: &Franchise) -> serde_json::Value {
    json!({
        "id": franchise.id,
        "name": franchise.name,
        "caption": franchise_card_caption(franchise),
        "figures": franchise_summary(franchise),
        "outstanding": franchise_outstanding(franchise),
    })
}

#[tauri::command]
fn dashboard_get(
    state: State<'_, AppState>,
    payload: DashboardRequest,
) -> Result<serde_json::Value, String> {
    let schools = lock(&state.service)?.load_schools().map_err(user_error)?;
    match payload.school_id.filter(|id| !id.is_empty()) {
        None => {
            let cards: Vec<serde_json::Value> = schools
                .iter()
                .map(|school| {
                    json!({
                        "id": school.id,
                        "name": school.name,
                        "caption": school_card_caption(school),
                        "figures": school_summary(school),
                    })
                })
                .collect();
            Ok(json!({ "stats": root_dashboard(&schools), "cards": cards }))
        }
        Some(school_id) => {
            let school = find_school(schools, &school_id)?;
            let cards: Vec<serde_json::Value> =
                school.franchises.iter().map(franchise_card).collect();
            Ok(json!({
                "stats": school_dashboard(&school),
                "figures": school_summary(&school),
                "cost_breakdown": school_cost_breakdown(&school.financials),
                "entry_balance": school_entry_balance(&school),
                "financials": school.financials,
                "cards": cards,
            }))
        }
    }
}

#[tauri::command]
fn school_add(state: State<'_, AppState>, payload: NameRequest) -> Result<Vec<School>, String> {
    let mut service = lock(&state.service)?;
    service.add_school(payload.name.as_str()).map_err(user_error)?;
    service.load_schools().map_err(user_error)
}

#[tauri::command]
fn franchise_add(
    state: State<'_, AppState>,
    payload: FranchiseAddRequest,
) -> Result<Vec<School>, String> {
    let mut service = lock(&state.service)?;
    service
        .add_franchise(payload.school_id.as_str(), payload.name.as_str())
        .map_err(user_error)?;
    service.load_schools().map_err(user_error)
}

#[tauri::command]
fn school_update_financials(
    state: State<'_, AppState>,
    payload: SchoolFinancialsRequest,
) -> Result<Vec<School>, String> {
    let mut service = lock(&state.service)?;
    service
        .update_school_financials(payload.school_id.as_str(), &payload.financials)
        .map_err(user_error)?;
    service.load_schools().map_err(user_error)
}

#[tauri::command]
fn school_rename(
    state: State<'_, AppState>,
    payload: SchoolRenameRequest,
) -> Result<Vec<School>, String> {
    let mut service = lock(&state.service)?;
    service
        .rename_school(payload.school_id.as_str(), payload.name.as_str())
        .map_err(user_error)?;
    service.load_schools().map_err(user_error)
}

#[tauri::command]
fn school_delete(state: State<'_, AppState>, payload: IdRequest) -> Result<Vec<School>, String> {
    let mut service = lock(&state.service)?;
    service.delete_school(payload.id.as_str()).map_err(user_error)?;
    service.load_schools().map_err(user_error)
}

#[tauri::command]
fn franchise_delete(
    state: State<'_, AppState>,
    payload: IdRequest,
) -> Result<Vec<School>, String> {
    let mut service = lock(&state.service)?;
    service.delete_franchise(payload.id.as_str()).map_err(user_error)?;
    let mut draft = lock(&state.draft)?;
    if draft.as_ref().is_some_and(|d| d.franchise_id() == payload.id) {
        *draft = None;
    }
    service.load_schools().map_err(user_error)
}

fn draft_view(draft: &FranchiseDraft) -> serde_json::Value {
    let fields: BTreeMap<FranchiseField, &str> = FranchiseField::ALL
        .iter()
        .map(|field| (*field, draft.field(*field)))
        .collect();
    json!({
        "franchise_id": draft.franchise_id(),
        "school_id": draft.school_id(),
        "name": draft.name(),
        "inventory": draft.inventory(),
        "fields": fields,
        "dirty": draft.is_dirty(),
        "total_items": draft.total_items(),
        "figures": draft.summary(),
    })
}

fn with_draft(
    state: &AppState,
    edit: impl FnOnce(&mut FranchiseDraft) -> Result<(), AppError>,
) -> Result<serde_json::Value, String> {
    let mut slot = lock(&state.draft)?;
    let draft = slot
        .as_mut()
        .ok_or_else(|| "Nenhuma unidade aberta para edição.".to_string())?;
    edit(draft).map_err(user_error)?;
    Ok(draft_view(draft))
}

#[tauri::command]
fn draft_open(
    state: State<'_, AppState>,
    payload: FranchiseRef,
) -> Result<serde_json::Value, String> {
    let schools = lock(&state.service)?.load_schools().map_err(user_error)?;
    let school = find_school(schools, &payload.school_id)?;
    let franchise = school
        .franchise(&payload.franchise_id)
        .ok_or_else(|| user_error(AppError::Missing("Unidade".to_string())))?;
    let draft = FranchiseDraft::new(franchise);
    let view = draft_view(&draft);
    *lock(&state.draft)? = Some(draft);
    Ok(view)
}

#[tauri::command]
fn draft_get(state: State<'_, AppState>) -> Result<Option<serde_json::Value>, String> {
    Ok(lock(&state.draft)?.as_ref().map(draft_view))
}

#[tauri::command]
fn draft_add_item(
    state: State<'_, AppState>,
    payload: DraftItemRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        draft.add_item(&payload.product, &payload.size, payload.quantity)?;
        Ok(())
    })
}

#[tauri::command]
fn draft_set_quantity(
    state: State<'_, AppState>,
    payload: DraftItemRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        draft.set_quantity(&payload.product, &payload.size, payload.quantity)?;
        Ok(())
    })
}

#[tauri::command]
fn draft_remove_item(
    state: State<'_, AppState>,
    payload: DraftItemRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        draft.remove_item(&payload.product, &payload.size);
        Ok(())
    })
}

#[tauri::command]
fn draft_rename_product(
    state: State<'_, AppState>,
    payload: DraftRenameRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        draft.rename_product(&payload.from, &payload.to)?;
        Ok(())
    })
}

#[tauri::command]
fn draft_rename_size(
    state: State<'_, AppState>,
    payload: DraftRenameRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        draft.rename_size(&payload.product, &payload.from, &payload.to)?;
        Ok(())
    })
}

#[tauri::command]
fn draft_set_field(
    state: State<'_, AppState>,
    payload: DraftFieldRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        if draft.set_field(payload.field, &payload.value) {
            Ok(())
        } else {
            Err(AppError::Validation("Valor inválido".to_string()))
        }
    })
}

#[tauri::command]
fn draft_set_name(
    state: State<'_, AppState>,
    payload: NameRequest,
) -> Result<serde_json::Value, String> {
    with_draft(&state, |draft| {
        draft.set_name(&payload.name);
        Ok(())
    })
}

#[tauri::command]
fn draft_save(state: State<'_, AppState>) -> Result<serde_json::Value, String> {
    let mut service = lock(&state.service)?;
    with_draft(&state, |draft| service.save_draft(draft))
}

#[tauri::command]
fn draft_discard(state: State<'_, AppState>) -> Result<bool, String> {
    Ok(lock(&state.draft)?.take().is_some())
}

#[tauri::command]
fn transactions_list(state: State<'_, AppState>) -> Result<Vec<serde_json::Value>, String> {
    let service = lock(&state.service)?;
    let schools = service.load_schools().map_err(user_error)?;
    let transactions = service.load_transactions().map_err(user_error)?;
    Ok(transactions
        .iter()
        .map(|tx| {
            json!({
                "transaction": tx,
                "source_label": source_label(tx, &schools),
                "category_label": tx.category.label(),
            })
        })
        .collect())
}

#[tauri::command]
fn fund_summary(state: State<'_, AppState>) -> Result<serde_json::Value, String> {
    let service = lock(&state.service)?;
    let schools = service.load_schools().map_err(user_error)?;
    let transactions = service.load_transactions().map_err(user_error)?;
    Ok(json!({
        "summary": FundSummary::from_transactions(&transactions, state.config.fund_target),
        "by_school": contributions_by_school(&transactions, &schools),
    }))
}

#[tauri::command]
fn transaction_add(
    state: State<'_, AppState>,
    payload: NewTransaction,
) -> Result<serde_json::Value, String> {
    let mut service = lock(&state.service)?;
    let tx = service.add_transaction(payload).map_err(user_error)?;
    Ok(json!({ "ok": true, "transaction": tx }))
}

#[tauri::command]
fn transaction_delete(state: State<'_, AppState>, payload: IdRequest) -> Result<bool, String> {
    lock(&state.service)?
        .delete_transaction(payload.id.as_str())
        .map_err(user_error)?;
    Ok(true)
}

#[tauri::command]
fn budget_quote(payload: BudgetRequest) -> Result<serde_json::Value, String> {
    let mut quote = BudgetQuote::new();
    for (item, text) in &payload.quantities {
        quote
            .set_quantity(item, text)
            .map_err(|err| user_error(err.into()))?;
    }
    Ok(json!({
        "lines": quote.lines(),
        "total": quote.total(),
        "total_label": quote.total().brl(),
        "total_items": quote.total_items(),
        "empty": quote.is_empty(),
        "text": quote.render(),
    }))
}

/// Uses the open draft when it is the requested unit, so unsaved counts are reported too.
#[tauri::command]
fn report_franchise(state: State<'_, AppState>, payload: FranchiseRef) -> Result<String, String> {
    let schools = lock(&state.service)?.load_schools().map_err(user_error)?;
    let school = find_school(schools, &payload.school_id)?;
    let draft = lock(&state.draft)?;
    let franchise = match draft.as_ref() {
        Some(d) if d.franchise_id() == payload.franchise_id => d.to_franchise(),
        _ => school
            .franchise(&payload.franchise_id)
            .cloned()
            .ok_or_else(|| user_error(AppError::Missing("Unidade".to_string())))?,
    };
    Ok(production_report(&school.name, &franchise))
}

#[tauri::command]
fn report_school(state: State<'_, AppState>, payload: IdRequest) -> Result<String, String> {
    let schools = lock(&state.service)?.load_schools().map_err(user_error)?;
    let school = find_school(schools, &payload.id)?;
    Ok(school_report(&school))
}

#[tauri::command]
fn clipboard_write(app: AppHandle, payload: TextRequest) -> Result<bool, String> {
    app.clipboard()
        .write_text(payload.text)
        .map_err(|err| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn share_whatsapp(app: AppHandle, payload: TextRequest) -> Result<bool, String> {
    let url = whatsapp_share_url(payload.text.as_str()).map_err(|err| err.to_string())?;
    app.opener()
        .open_url(url.as_str(), Option::<String>::None)
        .map_err(|err: tauri_plugin_opener::Error| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn export_inventory_csv(
    state: State<'_, AppState>,
    payload: IdRequest,
) -> Result<SaveCsvResult, String> {
    let schools = lock(&state.service)?.load_schools().map_err(user_error)?;
    let school = find_school(schools, &payload.id)?;
    let filename = sanitize_export_filename(format!("estoque-{}", school.name).as_str());
    let path = rfd::FileDialog::new()
        .add_filter("CSV", &["csv"])
        .set_file_name(filename.as_str())
        .save_file();

    let Some(path) = path else {
        return Ok(SaveCsvResult {
            ok: false,
            canceled: true,
            filename,
            path: None,
            error: None,
        });
    };

    if let Err(err) = fs::write(&path, inventory_csv(&school)) {
        log::error!("csv export to {} failed: {err}", path.display());
        return Ok(SaveCsvResult {
            ok: false,
            canceled: false,
            filename,
            path: Some(path.to_string_lossy().to_string()),
            error: Some(err.to_string()),
        });
    }
    Ok(SaveCsvResult {
        ok: true,
        canceled: false,
        filename,
        path: Some(path.to_string_lossy().to_string()),
        error: None,
    })
}

pub fn run() {
    crate::init_logging();
    let result = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let config = AppConfig::from_env();
            let state = AppState::from_config(config)?;
            log::info!("storage: {}", lock(&state.service)?.describe_store());
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            app_version,
            storage_info,
            schools_list,
            dashboard_get,
            school_add,
            franchise_add,
            school_update_financials,
            school_rename,
            school_delete,
            franchise_delete,
            draft_open,
            draft_get,
            draft_add_item,
            draft_set_quantity,
            draft_remove_item,
            draft_rename_product,
            draft_rename_size,
            draft_set_field,
            draft_set_name,
            draft_save,
            draft_discard,
            transactions_list,
            fund_summary,
            transaction_add,
            transaction_delete,
            budget_quote,
            report_franchise,
            report_school,
            clipboard_write,
            share_whatsapp,
            export_inventory_csv
        ])
        .run(tauri::generate_context!());
    if let Err(err) = result {
        log::error!("failed to run Uniform Manager: {err}");
    }
}
