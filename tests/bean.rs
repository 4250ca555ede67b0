#[cfg(test)]
mod tests {
    use bindery::{
        AnsiDialect, Arg, Bean, BeanArray, BindError, ColumnInfo, Holder, HolderType,
        ParsedStatement, SqlService, SqlType, TemplateBuilder, Value, shared,
    };
    use bindery_tests::{MockDatabase, Response, init_logs, row, silent_logs};
    use parking_lot::RwLock;
    use std::sync::Arc;

    #[derive(Bean, Default)]
    struct Address {
        city: String,
        zip: Option<String>,
    }

    #[derive(Bean)]
    #[bean_name("Customer")]
    #[property_case("camel")]
    struct CustomerForm {
        customer_id: i64,
        first_name: Option<String>,
        #[property_name("mail")]
        email_address: Option<String>,
        #[property_read_only]
        created_by: String,
        address: Arc<RwLock<Address>>,
        tags: Vec<String>,
        total: Holder,
        #[property_skip]
        #[allow(dead_code)]
        cache: Vec<u8>,
    }

    fn customer() -> Arc<RwLock<CustomerForm>> {
        shared(CustomerForm {
            customer_id: 12,
            first_name: Some("Ada".into()),
            email_address: None,
            created_by: "admin".into(),
            address: shared(Address {
                city: "Turin".into(),
                zip: Some("10121".into()),
            }),
            tags: vec!["vip".into(), "new".into()],
            total: Holder::empty::<i64>(),
            cache: Vec::new(),
        })
    }

    #[test]
    fn derived_properties() {
        assert_eq!(CustomerForm::bean_name(), "Customer");
        let names = CustomerForm::properties()
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "customerId",
                "firstName",
                "mail",
                "createdBy",
                "address",
                "tags",
                "total"
            ]
        );
        let writable = CustomerForm::properties()
            .iter()
            .filter(|p| p.set.is_some())
            .map(|p| p.name)
            .collect::<Vec<_>>();
        assert_eq!(writable, ["customerId", "firstName", "mail", "tags"]);
        assert!(CustomerForm::find_property("FirstName").is_some());
        assert!(CustomerForm::find_property("cache").is_none());

        assert_eq!(Address::bean_name(), "Address");
        assert!(Address::find_property("zip").is_some());
    }

    fn plain(statement: &ParsedStatement, roots: &[Arg]) -> String {
        SqlService::new(AnsiDialect)
            .create_plain_text(statement, roots)
            .expect("Failed to render the statement")
    }

    #[test]
    fn bean_inputs() {
        let customer = customer();
        let roots = [Arg::bean(&customer)];
        let statement = TemplateBuilder::new()
            .text("SELECT * FROM customer WHERE id = ")
            .input("customerId")
            .text(" AND city = ")
            .input("address.city")
            .text(" AND ")
            .input_cmp("tag", "=", "tags")
            .build();
        assert_eq!(
            plain(&statement, &roots),
            "SELECT * FROM customer WHERE id = 12 AND city = 'Turin' AND ((tag IN ('vip','new')))"
        );

        // Null values are inlined as null
        customer.write().address = shared(Address::default());
        let statement = TemplateBuilder::new()
            .text("SELECT * FROM customer WHERE zip = ")
            .input("address.zip")
            .build();
        assert_eq!(
            plain(&statement, &roots),
            "SELECT * FROM customer WHERE zip = null"
        );
    }

    #[test]
    fn beans_as_batch() {
        let beans = Arg::beans([
            Address {
                city: "Turin".into(),
                zip: None,
            },
            Address {
                city: "Milan".into(),
                zip: None,
            },
        ]);
        let statement = TemplateBuilder::new()
            .text("INSERT INTO city (name) VALUES (")
            .input("city")
            .text(")")
            .build();
        // Only the first execution is rendered
        assert_eq!(
            plain(&statement, &[beans]),
            "INSERT INTO city (name) VALUES ('Turin')"
        );
    }

    #[test]
    fn beans_in_a_list_holder() {
        let address = shared(Address {
            city: "Turin".into(),
            zip: None,
        });
        let ids = Holder::new(
            HolderType::List(Value::Int64(None)),
            Arg::Collection(vec![Arg::from(4i64), Arg::bean(&address), Arg::from(6i64)]),
        );
        let statement = TemplateBuilder::new()
            .text("SELECT * FROM customer WHERE ")
            .input_cmp("id", "IN", "ids")
            .build();
        silent_logs! {
            let error = SqlService::new(AnsiDialect)
                .create_plain_text(&statement, &[Arg::pair("ids", ids.clone())])
                .expect_err("A bean is not a list element");
            assert!(matches!(
                error.downcast_ref::<BindError>(),
                Some(BindError::NotScalar { index: 1, .. })
            ));
            assert!(ids.values().is_err());
        }

        // Without the bean every value is bound
        ids.set(Arg::collection([4i64, 6]));
        assert_eq!(
            plain(&statement, &[Arg::pair("ids", ids)]),
            "SELECT * FROM customer WHERE ((id IN (4,6)))"
        );
    }

    #[tokio::test]
    async fn bean_outputs() {
        init_logs();
        let database = MockDatabase::new(|_| {
            Ok(Response::rows(
                vec![
                    ColumnInfo::new("first_name", SqlType::Varchar, 40),
                    ColumnInfo::new("city", SqlType::Varchar, 40),
                    ColumnInfo::new("total", SqlType::BigInt, 20),
                ],
                [row([
                    Value::Varchar(Some("Grace".into())),
                    Value::Varchar(Some("Rome".into())),
                    Value::Int64(Some(300)),
                ])],
            ))
        });
        let service = SqlService::new(AnsiDialect);
        let mut transaction = service.begin(database.connect());
        let customer = customer();
        let statement = TemplateBuilder::new()
            .text("SELECT first_name, city, total FROM customer WHERE id = ")
            .input("customerId")
            .select_into("firstName")
            .select_into("address.city")
            .select_into("total")
            .build();
        service
            .select_into(&mut transaction, &statement, &[Arg::bean(&customer)])
            .await
            .expect("Failed to select into the customer");
        let customer = customer.read();
        assert_eq!(customer.first_name.as_deref(), Some("Grace"));
        assert_eq!(customer.address.read().city, "Rome");
        assert_eq!(customer.total.get_as::<i64>().unwrap(), Some(300));
    }

    #[tokio::test]
    async fn read_only_outputs() {
        init_logs();
        let database = MockDatabase::new(|_| Ok(Response::default()));
        let service = SqlService::new(AnsiDialect);
        let mut transaction = service.begin(database.connect());
        let statement = TemplateBuilder::new()
            .text("SELECT created_by FROM customer")
            .select_into("createdBy")
            .build();
        silent_logs! {
            let error = service
                .select_into(&mut transaction, &statement, &[Arg::bean(&customer())])
                .await
                .expect_err("createdBy is read only");
            assert!(matches!(
                error.downcast_ref::<BindError>(),
                Some(BindError::UnresolvedOutput { .. })
            ));
        }
        assert!(database.prepared().is_empty());
    }

    #[tokio::test]
    async fn bean_array_outputs() {
        init_logs();
        let database = MockDatabase::new(|_| {
            Ok(Response::rows(
                vec![ColumnInfo::new("city", SqlType::Varchar, 40)],
                ["Turin", "Milan", "Rome"].map(|v| row([Value::Varchar(Some(v.into()))])),
            ))
        });
        let service = SqlService::new(AnsiDialect);
        let mut transaction = service.begin(database.connect());
        let addresses = BeanArray::<Address>::default();
        let statement = TemplateBuilder::new()
            .text("SELECT city FROM address")
            .select_into("city")
            .build();
        service
            .select_into(&mut transaction, &statement, &[addresses.arg()])
            .await
            .expect("Failed to select into the addresses");
        assert_eq!(addresses.len(), 3);
        assert_eq!(
            addresses
                .read()
                .iter()
                .map(|v| v.city.as_str())
                .collect::<Vec<_>>(),
            ["Turin", "Milan", "Rome"]
        );
        assert!(addresses.read().iter().all(|v| v.zip.is_none()));
    }
}
