//! Operation Catalog
//!
//! Every remote operation the admin UI can perform: its public name, whether
//! it reads or writes, its parameter schema, how validated parameters map onto
//! a backend endpoint, and which cached reads a successful write makes stale.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use crate::client::{take_id, Endpoint};
use crate::error::{ActionError, Result};
use crate::schema::{Field, FieldType, NormalizedParams, Schema};

// == Operation Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Cacheable read
    Query,
    /// Write; invalidates related reads on success
    Mutation,
}

// == Operation ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Logout,
    Profile,
    ChangePassword,

    ListProducts,
    GetProduct,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,

    ListWarehouses,
    CreateWarehouse,
    UpdateWarehouse,
    DeleteWarehouse,

    ListBranches,
    CreateBranch,
    UpdateBranch,

    ListOrders,
    GetOrder,
    UpdateOrderStatus,

    ListOffers,
    CreateOffer,
    UpdateOfferStatus,

    ListInvoices,
    GetInvoice,
    CreateInvoice,

    ListEmployees,
    CreateEmployee,
    UpdateEmployee,
    DeleteEmployee,

    ListRoles,
    CreateRole,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::Login,
        Operation::Logout,
        Operation::Profile,
        Operation::ChangePassword,
        Operation::ListProducts,
        Operation::GetProduct,
        Operation::CreateProduct,
        Operation::UpdateProduct,
        Operation::DeleteProduct,
        Operation::ListWarehouses,
        Operation::CreateWarehouse,
        Operation::UpdateWarehouse,
        Operation::DeleteWarehouse,
        Operation::ListBranches,
        Operation::CreateBranch,
        Operation::UpdateBranch,
        Operation::ListOrders,
        Operation::GetOrder,
        Operation::UpdateOrderStatus,
        Operation::ListOffers,
        Operation::CreateOffer,
        Operation::UpdateOfferStatus,
        Operation::ListInvoices,
        Operation::GetInvoice,
        Operation::CreateInvoice,
        Operation::ListEmployees,
        Operation::CreateEmployee,
        Operation::UpdateEmployee,
        Operation::DeleteEmployee,
        Operation::ListRoles,
        Operation::CreateRole,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Logout => "logout",
            Operation::Profile => "profile",
            Operation::ChangePassword => "change_password",
            Operation::ListProducts => "list_products",
            Operation::GetProduct => "get_product",
            Operation::CreateProduct => "create_product",
            Operation::UpdateProduct => "update_product",
            Operation::DeleteProduct => "delete_product",
            Operation::ListWarehouses => "list_warehouses",
            Operation::CreateWarehouse => "create_warehouse",
            Operation::UpdateWarehouse => "update_warehouse",
            Operation::DeleteWarehouse => "delete_warehouse",
            Operation::ListBranches => "list_branches",
            Operation::CreateBranch => "create_branch",
            Operation::UpdateBranch => "update_branch",
            Operation::ListOrders => "list_orders",
            Operation::GetOrder => "get_order",
            Operation::UpdateOrderStatus => "update_order_status",
            Operation::ListOffers => "list_offers",
            Operation::CreateOffer => "create_offer",
            Operation::UpdateOfferStatus => "update_offer_status",
            Operation::ListInvoices => "list_invoices",
            Operation::GetInvoice => "get_invoice",
            Operation::CreateInvoice => "create_invoice",
            Operation::ListEmployees => "list_employees",
            Operation::CreateEmployee => "create_employee",
            Operation::UpdateEmployee => "update_employee",
            Operation::DeleteEmployee => "delete_employee",
            Operation::ListRoles => "list_roles",
            Operation::CreateRole => "create_role",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    pub fn kind(self) -> OperationKind {
        match self {
            Operation::Profile
            | Operation::ListProducts
            | Operation::GetProduct
            | Operation::ListWarehouses
            | Operation::ListBranches
            | Operation::ListOrders
            | Operation::GetOrder
            | Operation::ListOffers
            | Operation::ListInvoices
            | Operation::GetInvoice
            | Operation::ListEmployees
            | Operation::ListRoles => OperationKind::Query,
            _ => OperationKind::Mutation,
        }
    }

    pub fn is_query(self) -> bool {
        self.kind() == OperationKind::Query
    }

    pub fn requires_auth(self) -> bool {
        self != Operation::Login
    }

    fn is_list(self) -> bool {
        matches!(
            self,
            Operation::ListProducts
                | Operation::ListWarehouses
                | Operation::ListBranches
                | Operation::ListOrders
                | Operation::ListOffers
                | Operation::ListInvoices
                | Operation::ListEmployees
                | Operation::ListRoles
        )
    }

    /// Backend collection the operation works on.
    fn resource(self) -> &'static str {
        match self {
            Operation::Login | Operation::Logout | Operation::Profile | Operation::ChangePassword => {
                "auth"
            }
            Operation::ListProducts
            | Operation::GetProduct
            | Operation::CreateProduct
            | Operation::UpdateProduct
            | Operation::DeleteProduct => "products",
            Operation::ListWarehouses
            | Operation::CreateWarehouse
            | Operation::UpdateWarehouse
            | Operation::DeleteWarehouse => "warehouses",
            Operation::ListBranches | Operation::CreateBranch | Operation::UpdateBranch => {
                "branches"
            }
            Operation::ListOrders | Operation::GetOrder | Operation::UpdateOrderStatus => "orders",
            Operation::ListOffers | Operation::CreateOffer | Operation::UpdateOfferStatus => {
                "offers"
            }
            Operation::ListInvoices | Operation::GetInvoice | Operation::CreateInvoice => {
                "invoices"
            }
            Operation::ListEmployees
            | Operation::CreateEmployee
            | Operation::UpdateEmployee
            | Operation::DeleteEmployee => "employees",
            Operation::ListRoles | Operation::CreateRole => "roles",
        }
    }

    // == Schema ==
    /// Parameter schema. Logout carries no parameters and passes through.
    pub fn schema(self) -> Option<&'static Schema> {
        let schema: &'static Schema = match self {
            Operation::Logout => return None,
            Operation::Login => &LOGIN,
            Operation::Profile => &EMPTY,
            Operation::ChangePassword => &CHANGE_PASSWORD,
            op if op.is_list() => &LIST,
            Operation::GetProduct
            | Operation::DeleteProduct
            | Operation::DeleteWarehouse
            | Operation::GetOrder
            | Operation::GetInvoice
            | Operation::DeleteEmployee => &BY_ID,
            Operation::CreateProduct => &PRODUCT_CREATE,
            Operation::UpdateProduct => &PRODUCT_UPDATE,
            Operation::CreateWarehouse => &WAREHOUSE_CREATE,
            Operation::UpdateWarehouse => &WAREHOUSE_UPDATE,
            Operation::CreateBranch => &BRANCH_CREATE,
            Operation::UpdateBranch => &BRANCH_UPDATE,
            Operation::UpdateOrderStatus => &ORDER_STATUS,
            Operation::CreateOffer => &OFFER_CREATE,
            Operation::UpdateOfferStatus => &OFFER_STATUS,
            Operation::CreateInvoice => &INVOICE_CREATE,
            Operation::CreateEmployee => &EMPLOYEE_CREATE,
            Operation::UpdateEmployee => &EMPLOYEE_UPDATE,
            Operation::CreateRole => &ROLE_CREATE,
            _ => &EMPTY,
        };
        Some(schema)
    }

    // == Prepare Params ==
    /// Canonicalises raw list payloads before validation: `deleted` and
    /// `paginate` given inside `filters` move to the top level, where the
    /// backend reads them. A top-level value wins over a nested one.
    pub fn prepare_params(self, raw: Value) -> Value {
        if !self.is_list() {
            return raw;
        }
        let Value::Object(mut map) = raw else {
            return raw;
        };
        let hoisted: Vec<(&str, Value)> = match map.get_mut("filters") {
            Some(Value::Object(filters)) => ["deleted", "paginate"]
                .into_iter()
                .filter_map(|key| filters.remove(key).map(|v| (key, v)))
                .collect(),
            _ => Vec::new(),
        };
        for (key, value) in hoisted {
            map.entry(key).or_insert(value);
        }
        Value::Object(map)
    }

    // == Endpoint ==
    /// Maps validated parameters onto the backend request.
    pub fn endpoint(self, mut params: NormalizedParams) -> Result<Endpoint> {
        let resource = self.resource();
        let endpoint = match self {
            Operation::Login => Endpoint::post("/auth/login", params).public(),
            Operation::Logout => Endpoint::post("/auth/logout", NormalizedParams::new()),
            Operation::Profile => Endpoint::get("/auth/profile"),
            Operation::ChangePassword => Endpoint::post("/auth/change-password", params),
            op if op.is_list() => Endpoint::post(format!("/{}/list", resource), params),
            Operation::GetProduct | Operation::GetOrder | Operation::GetInvoice => {
                let id = take_id(&mut params, "id")?;
                Endpoint::get(format!("/{}/{}", resource, id))
            }
            Operation::CreateProduct
            | Operation::CreateWarehouse
            | Operation::CreateBranch
            | Operation::CreateOffer
            | Operation::CreateInvoice
            | Operation::CreateEmployee
            | Operation::CreateRole => Endpoint::post(format!("/{}", resource), params),
            Operation::UpdateProduct
            | Operation::UpdateWarehouse
            | Operation::UpdateBranch
            | Operation::UpdateEmployee => {
                let id = take_id(&mut params, "id")?;
                Endpoint::patch(format!("/{}/{}", resource, id), params)
            }
            Operation::UpdateOrderStatus | Operation::UpdateOfferStatus => {
                let id = take_id(&mut params, "id")?;
                Endpoint::patch(format!("/{}/{}/status", resource, id), params)
            }
            Operation::DeleteProduct | Operation::DeleteWarehouse | Operation::DeleteEmployee => {
                let id = take_id(&mut params, "id")?;
                Endpoint::delete(format!("/{}/{}", resource, id))
            }
            other => return Err(ActionError::UnknownOperation(other.name().to_string())),
        };
        Ok(endpoint)
    }

    // == Invalidation ==
    /// Query operations whose cached reads a successful run of `self` makes stale.
    pub fn invalidates(self) -> &'static [&'static str] {
        match self {
            Operation::ChangePassword => &["profile"],
            Operation::CreateProduct | Operation::UpdateProduct | Operation::DeleteProduct => {
                &["list_products", "get_product"]
            }
            Operation::CreateWarehouse
            | Operation::UpdateWarehouse
            | Operation::DeleteWarehouse => &["list_warehouses"],
            Operation::CreateBranch | Operation::UpdateBranch => &["list_branches"],
            Operation::UpdateOrderStatus => &["list_orders", "get_order"],
            Operation::CreateOffer | Operation::UpdateOfferStatus => &["list_offers"],
            // Invoicing moves stock.
            Operation::CreateInvoice => &["list_invoices", "get_invoice", "list_products", "get_product"],
            Operation::CreateEmployee | Operation::UpdateEmployee | Operation::DeleteEmployee => {
                &["list_employees"]
            }
            Operation::CreateRole => &["list_roles"],
            _ => &[],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| ActionError::UnknownOperation(s.to_string()))
    }
}

// == Schemas ==
const ORDER_STATUSES: &[&str] = &[
    "pending",
    "accepted",
    "rejected",
    "shipped",
    "delivered",
    "cancelled",
];
const OFFER_STATUSES: &[&str] = &["active", "inactive", "expired"];

fn required_if(field: Field, required: bool) -> Field {
    if required {
        field.required()
    } else {
        field
    }
}

fn id_field() -> Field {
    Field::integer("id").required().min(1.0)
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn passwords_match(obj: &Map<String, Value>) -> bool {
    match (text(obj, "password"), text(obj, "password_confirmation")) {
        (Some(password), Some(confirmation)) => password == confirmation,
        // Missing fields are reported as required on their own.
        _ => true,
    }
}

static EMPTY: Lazy<Schema> = Lazy::new(Schema::default);

static LIST: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        Field::any("filters").default(json!({})),
        Field::string("order_by").max_len(64),
        Field::one_of("order_by_direction", &["asc", "desc"]).default(json!("asc")),
        Field::integer("page").min(1.0).default(json!(1)),
        Field::integer("per_page").min(1.0).max(100.0).default(json!(15)),
        Field::boolean("paginate").default(json!(true)),
        Field::boolean("deleted").default(json!(false)),
    ])
});

static BY_ID: Lazy<Schema> = Lazy::new(|| Schema::new(vec![id_field()]));

static LOGIN: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        Field::string("email").required().min_len(1).email(),
        Field::string("password").required().min_len(1),
    ])
});

static CHANGE_PASSWORD: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        Field::string("current_password").required().min_len(1),
        Field::string("password").required().min_len(8),
        Field::string("password_confirmation").required().min_len(1),
    ])
    .refine("password_confirmation", "Passwords do not match", passwords_match)
});

fn product_fields(create: bool) -> Vec<Field> {
    vec![
        required_if(Field::string("name").min_len(1).max_len(255), create),
        Field::string("barcode").max_len(64),
        required_if(Field::number("price").min(0.0), create),
        Field::integer("quantity").min(0.0),
        Field::integer("category_id").min(1.0),
        Field::string("description").max_len(2000),
        Field::date("expiry_date"),
    ]
}

static PRODUCT_CREATE: Lazy<Schema> = Lazy::new(|| Schema::new(product_fields(true)));

static PRODUCT_UPDATE: Lazy<Schema> = Lazy::new(|| {
    let mut fields = vec![id_field()];
    fields.extend(product_fields(false));
    Schema::new(fields)
});

fn warehouse_fields(create: bool) -> Vec<Field> {
    vec![
        required_if(Field::string("name").min_len(1).max_len(255), create),
        Field::string("address").max_len(500),
        Field::string("phone").phone(),
    ]
}

static WAREHOUSE_CREATE: Lazy<Schema> = Lazy::new(|| Schema::new(warehouse_fields(true)));

static WAREHOUSE_UPDATE: Lazy<Schema> = Lazy::new(|| {
    let mut fields = vec![id_field()];
    fields.extend(warehouse_fields(false));
    Schema::new(fields)
});

fn branch_fields(create: bool) -> Vec<Field> {
    vec![
        required_if(Field::string("name").min_len(1).max_len(255), create),
        Field::string("address").max_len(500),
        Field::string("phone").phone(),
        Field::integer("warehouse_id").min(1.0),
    ]
}

static BRANCH_CREATE: Lazy<Schema> = Lazy::new(|| Schema::new(branch_fields(true)));

static BRANCH_UPDATE: Lazy<Schema> = Lazy::new(|| {
    let mut fields = vec![id_field()];
    fields.extend(branch_fields(false));
    Schema::new(fields)
});

static ORDER_STATUS: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        id_field(),
        Field::one_of("status", ORDER_STATUSES).required(),
        Field::string("reason").max_len(500),
    ])
    .refine("reason", "A reason is required when rejecting", |obj| {
        text(obj, "status").as_deref() != Some("rejected")
            || text(obj, "reason").is_some_and(|r| !r.trim().is_empty())
    })
});

static OFFER_CREATE: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        Field::integer("product_id").required().min(1.0),
        Field::number("discount").required().min(0.0).max(100.0),
        Field::date("start_date").required(),
        Field::date("end_date").required(),
        Field::string("description").max_len(1000),
    ])
    // Dates are normalised to YYYY-MM-DD, so text order is date order.
    .refine("end_date", "End date must not be before start date", |obj| {
        match (text(obj, "start_date"), text(obj, "end_date")) {
            (Some(start), Some(end)) => end >= start,
            _ => true,
        }
    })
});

static OFFER_STATUS: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        id_field(),
        Field::one_of("status", OFFER_STATUSES).required(),
    ])
});

static INVOICE_CREATE: Lazy<Schema> = Lazy::new(|| {
    let line = Schema::new(vec![
        Field::integer("product_id").required().min(1.0),
        Field::integer("quantity").required().min(1.0),
        Field::number("price").required().min(0.0),
    ]);
    Schema::new(vec![
        Field::string("customer_name").max_len(255),
        Field::integer("branch_id").min(1.0),
        Field::array("items", FieldType::Object(line))
            .required()
            .min_len(1),
        Field::string("notes").max_len(2000),
    ])
});

static EMPLOYEE_CREATE: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        Field::string("name").required().min_len(1).max_len(255),
        Field::string("email").required().min_len(1).email(),
        Field::string("phone").phone(),
        Field::integer("role_id").required().min(1.0),
        Field::integer("branch_id").min(1.0),
        Field::string("password").required().min_len(8),
        Field::string("password_confirmation").required().min_len(1),
    ])
    .refine("password_confirmation", "Passwords do not match", passwords_match)
});

static EMPLOYEE_UPDATE: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        id_field(),
        Field::string("name").min_len(1).max_len(255),
        Field::string("email").email(),
        Field::string("phone").phone(),
        Field::integer("role_id").min(1.0),
        Field::integer("branch_id").min(1.0),
    ])
});

static ROLE_CREATE: Lazy<Schema> = Lazy::new(|| {
    Schema::new(vec![
        Field::string("name").required().min_len(1).max_len(100),
        Field::array("permissions", FieldType::String).default(json!([])),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpMethod;
    use crate::schema::validate;

    fn run(op: Operation, raw: Value) -> std::result::Result<NormalizedParams, crate::schema::ValidationErrors> {
        let schema = op.schema().expect("operation has a schema");
        validate(schema, &op.prepare_params(raw))
    }

    #[test]
    fn test_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()), Some(*op));
        }
        assert!("drop_tables".parse::<Operation>().is_err());
    }

    #[test]
    fn test_only_login_is_public() {
        let public: Vec<_> = Operation::ALL
            .iter()
            .filter(|op| !op.requires_auth())
            .collect();
        assert_eq!(public, vec![&Operation::Login]);
    }

    #[test]
    fn test_mutations_only_invalidate_queries() {
        for op in Operation::ALL {
            for name in op.invalidates() {
                let target = Operation::from_name(name).unwrap();
                assert!(target.is_query(), "{} invalidates non-query {}", op, name);
            }
            if op.is_query() {
                assert!(op.invalidates().is_empty());
            }
        }
    }

    #[test]
    fn test_list_defaults_and_hoisting() {
        let params = run(
            Operation::ListProducts,
            json!({"filters": {"name": "x", "deleted": "true"}}),
        )
        .unwrap();

        assert_eq!(params.get("deleted"), Some(&json!(true)));
        assert_eq!(params.get("paginate"), Some(&json!(true)));
        assert_eq!(params.get("page"), Some(&json!(1)));
        assert_eq!(params.get("per_page"), Some(&json!(15)));
        assert_eq!(params.get("filters"), Some(&json!({"name": "x"})));

        let endpoint = Operation::ListProducts.endpoint(params).unwrap();
        assert_eq!(endpoint.method, HttpMethod::Post);
        assert_eq!(endpoint.path, "/products/list");
    }

    #[test]
    fn test_top_level_flag_wins_over_filters() {
        let params = run(
            Operation::ListOrders,
            json!({"deleted": false, "filters": {"deleted": true}}),
        )
        .unwrap();
        assert_eq!(params.get("deleted"), Some(&json!(false)));
    }

    #[test]
    fn test_rejected_order_requires_reason() {
        let errors = run(
            Operation::UpdateOrderStatus,
            json!({"id": 7, "status": "rejected", "reason": ""}),
        )
        .unwrap_err();
        assert!(errors.contains("reason"));
        assert_eq!(errors.len(), 1);

        let params = run(
            Operation::UpdateOrderStatus,
            json!({"id": "7", "status": "rejected", "reason": "Expired stock"}),
        )
        .unwrap();
        let endpoint = Operation::UpdateOrderStatus.endpoint(params).unwrap();
        assert_eq!(endpoint.method, HttpMethod::Patch);
        assert_eq!(endpoint.path, "/orders/7/status");
        assert_eq!(
            endpoint.body,
            Some(json!({"status": "rejected", "reason": "Expired stock"}))
        );
    }

    #[test]
    fn test_offer_dates_ordered() {
        let errors = run(
            Operation::CreateOffer,
            json!({"product_id": 1, "discount": 10, "start_date": "2024-05-10", "end_date": "2024-05-01"}),
        )
        .unwrap_err();
        assert!(errors.contains("end_date"));
    }

    #[test]
    fn test_invoice_items_reported_by_path() {
        let errors = run(
            Operation::CreateInvoice,
            json!({"items": [{"product_id": 1, "quantity": 1, "price": 5}, {"product_id": 2, "quantity": 0}]}),
        )
        .unwrap_err();
        assert!(errors.contains("items.1.quantity"));
        assert!(errors.contains("items.1.price"));

        let errors = run(Operation::CreateInvoice, json!({"items": []})).unwrap_err();
        assert!(errors.contains("items"));
    }

    #[test]
    fn test_employee_password_confirmation() {
        let errors = run(
            Operation::CreateEmployee,
            json!({
                "name": "Sami",
                "email": "sami@example.com",
                "role_id": 2,
                "password": "secret123",
                "password_confirmation": "secret124"
            }),
        )
        .unwrap_err();
        assert!(errors.contains("password_confirmation"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_path_ids_leave_the_body() {
        let params = run(Operation::UpdateProduct, json!({"id": 4, "price": "12.5"})).unwrap();
        let endpoint = Operation::UpdateProduct.endpoint(params).unwrap();
        assert_eq!(endpoint.path, "/products/4");
        assert_eq!(endpoint.body, Some(json!({"price": 12.5})));

        let params = run(Operation::DeleteEmployee, json!({"id": 9})).unwrap();
        let endpoint = Operation::DeleteEmployee.endpoint(params).unwrap();
        assert_eq!(endpoint.method, HttpMethod::Delete);
        assert!(endpoint.body.is_none());
    }

    #[test]
    fn test_login_endpoint_is_public() {
        let params = run(Operation::Login, json!({"email": "a@b.co", "password": "pw"})).unwrap();
        let endpoint = Operation::Login.endpoint(params).unwrap();
        assert!(!endpoint.auth);
        assert_eq!(endpoint.path, "/auth/login");
    }
}
